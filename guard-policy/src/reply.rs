//! Parsing of the classifier's two-line reply.

use crate::category::CategoryCode;
use crate::gate::{GateError, GateResult};
use crate::verdict::Verdict;

const SAFE: &str = "safe";
const UNSAFE: &str = "unsafe";

/// Parses a classifier reply into a [`Verdict`].
///
/// The reply is trimmed, then read line by line: the first line must be exactly
/// `safe` or `unsafe`; an `unsafe` line must be followed by a non-blank line of
/// comma-separated codes, which are kept verbatim.
///
/// # Errors
///
/// Returns [`GateError::MalformedResponse`] for anything else.
pub fn parse_reply(reply: &str) -> GateResult<Verdict> {
    let mut lines = reply.trim().lines();

    match lines.next() {
        Some(SAFE) => Ok(Verdict::safe()),
        Some(UNSAFE) => {
            let codes = lines
                .next()
                .filter(|line| !line.trim().is_empty())
                .ok_or_else(|| GateError::malformed("unsafe verdict without categories", reply))?;

            Verdict::flagged(codes.split(',').map(CategoryCode::new).collect())
                .ok_or_else(|| GateError::malformed("unsafe verdict without categories", reply))
        }
        Some(other) if !other.is_empty() => Err(GateError::malformed(
            format!("unrecognized verdict line `{other}`"),
            reply,
        )),
        _ => Err(GateError::malformed("empty classifier reply", reply)),
    }
}
