//! Organization-unique department slugs.
//!
//! Names are normalized to lowercase `a-z0-9-`. A collision inside the
//! organization is resolved by appending the allocation time in base 36.

use chrono::Utc;
use sea_orm::ConnectionTrait;
use tracing::debug;
use uuid::Uuid;

use crate::db::department;
use crate::error::{AppError, Result};

/// Suffixed candidates tried before giving up.
const MAX_SUFFIX_ATTEMPTS: i64 = 8;

/// Normalize a display name into a URL-safe slug of at most `max_len` chars.
///
/// Returns `None` when nothing alphanumeric survives.
pub fn normalize(input: &str, max_len: usize) -> Option<String> {
    let mut slug = String::new();
    let mut prev_dash = false;
    for ch in input.trim().to_lowercase().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch);
            prev_dash = false;
        } else if !prev_dash {
            slug.push('-');
            prev_dash = true;
        }
    }
    let truncated: String = slug.trim_matches('-').chars().take(max_len).collect();
    let normalized = truncated.trim_end_matches('-');
    if normalized.is_empty() {
        return None;
    }
    Some(normalized.to_string())
}

/// Render a non-negative integer in lowercase base 36.
pub fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Append `-{suffix}` to `base`, shortening the base so the result fits `max_len`.
fn with_suffix(base: &str, suffix: &str, max_len: usize) -> Option<String> {
    let budget = max_len.checked_sub(suffix.len() + 1)?;
    let head: String = base.chars().take(budget).collect();
    let head = head.trim_end_matches('-');
    if head.is_empty() {
        return None;
    }
    Some(format!("{head}-{suffix}"))
}

/// Allocate a slug for `name` in the organization using the current time.
pub async fn allocate<C: ConnectionTrait>(
    db: &C,
    organization_id: Uuid,
    name: &str,
    exclude_id: Option<Uuid>,
    max_len: usize,
) -> Result<String> {
    allocate_at(db, organization_id, name, exclude_id, max_len, Utc::now().timestamp_millis()).await
}

/// Allocate a slug with an explicit clock value in milliseconds.
///
/// `exclude_id` is the department being renamed, whose own slug does not
/// count as a collision.
pub async fn allocate_at<C: ConnectionTrait>(
    db: &C,
    organization_id: Uuid,
    name: &str,
    exclude_id: Option<Uuid>,
    max_len: usize,
    now_millis: i64,
) -> Result<String> {
    let base = normalize(name, max_len)
        .ok_or_else(|| AppError::validation("name must contain at least one letter or digit"))?;

    if !department::slug_exists(db, organization_id, &base, exclude_id).await? {
        return Ok(base);
    }

    for offset in 0..MAX_SUFFIX_ATTEMPTS {
        let stamp = u64::try_from(now_millis.saturating_add(offset)).unwrap_or_default();
        let candidate = with_suffix(&base, &to_base36(stamp), max_len)
            .ok_or_else(|| AppError::validation("slug length limit too small for a unique suffix"))?;
        if !department::slug_exists(db, organization_id, &candidate, exclude_id).await? {
            debug!("Slug `{base}` taken in organization {organization_id}, using `{candidate}`");
            return Ok(candidate);
        }
    }

    Err(AppError::validation(format!("could not allocate a unique slug for `{name}`")))
}
