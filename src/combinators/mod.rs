//! Resilience combinators: one generic algorithm each, two sugar layers.
//!
//! Every file in this module follows the same layout, mirroring the
//! protocol in [`crate::interp`]:
//!
//! 1. a **generic combinator** (`*_m`) written against [`crate::Interp`],
//!    holding the complete control-flow algorithm,
//! 2. **sugar for [`crate::Effect`]** (no suffix), instantiating the
//!    generic combinator with [`crate::EffectInterp`],
//! 3. **sugar for [`crate::WriterEffect`]** (`_writer` suffix),
//!    instantiating it with [`crate::WriterInterp`] so logs of contributing
//!    branches merge (except the race family, which keeps only the winner's
//!    log).
//!
//! Custom effect types reuse the `*_m` functions directly by implementing
//! [`crate::Interp`].
//!
//! # Sequencing guarantees
//!
//! `fold`, `traverse`, `retry`, `repeat_until`, and `fallback_chain` are
//! strictly sequential: one step completes before the next begins.
//! `parallel`, `gather*`, `zip_par`, `validate`, `partition`, `batch`,
//! `best_of*`, and `vote` launch every branch and await joint completion;
//! `batch`/`traverse_par` additionally bound in-flight work. `race`,
//! `race_ok`, and `timeout` cancel losing or expired work; a cancelled
//! branch's partial output (including partial logs) is discarded.

pub mod batch;
pub mod bracket;
pub mod fallback;
pub mod fold;
pub mod guard;
pub mod parallel;
pub mod race;
pub mod rate_limit;
pub mod recover;
pub mod repeat;
pub mod retry;
pub mod select;
pub mod tap;
pub mod timing;
pub mod traverse;
pub mod validate;

pub use batch::{batch, batch_all, batch_all_m, batch_all_writer, batch_m, batch_writer};
pub use bracket::{
    bracket, bracket_m, bracket_on_error, bracket_on_error_writer, bracket_writer, with_resource,
    with_resource_m, with_resource_writer,
};
pub use fallback::{
    fallback, fallback_chain, fallback_chain_m, fallback_chain_writer, fallback_with,
    fallback_writer,
};
pub use fold::{fold, fold_m, fold_writer};
pub use guard::{ensure, ensure_m, ensure_writer, reject, reject_m, reject_writer};
pub use parallel::{
    gather2, gather2_m, gather2_writer, gather3, gather3_m, gather3_writer, parallel, parallel_m,
    parallel_writer, zip_par, zip_par_writer, zip_with,
};
pub use race::{race, race_m, race_ok, race_ok_m, race_ok_writer, race_writer};
pub use rate_limit::{rate_limit, rate_limit_m, rate_limit_writer, TokenBucket};
pub use recover::{
    recover, recover_m, recover_with, recover_with_m, recover_with_writer, recover_writer,
};
pub use repeat::{repeat_until, repeat_until_m, repeat_until_writer};
pub use retry::{retry, retry_m, retry_writer};
pub use select::{
    best_of, best_of_many, best_of_many_m, best_of_many_writer, best_of_writer, vote, vote_m,
    vote_writer,
};
pub use tap::{tap, tap_err, tap_err_m, tap_err_writer, tap_m, tap_writer};
pub use timing::{delay, delay_m, delay_writer, timeout, timeout_m, timeout_writer};
pub use traverse::{
    replicate, replicate_writer, sequence, sequence_writer, traverse, traverse_m, traverse_par,
    traverse_par_writer, traverse_writer,
};
pub use validate::{
    partition, partition_m, partition_writer, validate, validate_m, validate_writer,
};
