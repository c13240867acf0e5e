// src/ledger/index.rs

//! Composite index names and key encoding.
//!
//! A composite key is `\0name\0attr1\0attr2\0...\0`. Because every segment is
//! terminated, a partial key built from the leading attributes is a strict
//! prefix of every full key that starts with them, which is what
//! lookups by prefix rely on. Plain record keys never start with `\0`.

use crate::errors::{Result, TupledagError};
use crate::types::AssetType;

const SEP: char = '\u{0}';

pub const IN_MODEL_INDEX: &str = "tuple~inModel~key";
pub const PLAN_RANK_INDEX: &str = "computePlan~computeplankey~worker~rank~key";
pub const PLAN_ALGO_INDEX: &str = "algo~computeplankey~key";
pub const PLAN_TUPLE_INDEX: &str = "tuple~computeplankey~key";
pub const MODEL_INDEX: &str = "model~modelKey~key";

/// `<kind>~algo~key`: (algo, key). Also used to list every tuple of a kind.
pub fn algo_index(kind: AssetType) -> String {
    format!("{kind}~algo~key")
}

/// `<kind>~worker~status~key`: (worker, status, key).
pub fn worker_status_index(kind: AssetType) -> String {
    format!("{kind}~worker~status~key")
}

/// `<kind>~tag~key`: (tag, key).
pub fn tag_index(kind: AssetType) -> String {
    format!("{kind}~tag~key")
}

/// Encode a full composite key.
pub fn composite_key(name: &str, attributes: &[&str]) -> Result<String> {
    let mut out = String::with_capacity(
        2 + name.len() + attributes.iter().map(|a| a.len() + 1).sum::<usize>(),
    );
    out.push(SEP);
    push_segment(&mut out, name)?;
    for attr in attributes {
        push_segment(&mut out, attr)?;
    }
    Ok(out)
}

/// Split a composite key back into its name and attributes.
pub fn split_composite_key(key: &str) -> Result<(String, Vec<String>)> {
    let body = key
        .strip_prefix(SEP)
        .and_then(|k| k.strip_suffix(SEP))
        .ok_or_else(|| TupledagError::internal(format!("malformed composite key {key:?}")))?;
    let mut parts = body.split(SEP).map(str::to_string);
    let name = parts
        .next()
        .ok_or_else(|| TupledagError::internal(format!("malformed composite key {key:?}")))?;
    Ok((name, parts.collect()))
}

fn push_segment(out: &mut String, segment: &str) -> Result<()> {
    if segment.contains(SEP) {
        return Err(TupledagError::bad_request(format!(
            "index attribute {segment:?} contains a NUL character"
        )));
    }
    out.push_str(segment);
    out.push(SEP);
    Ok(())
}
