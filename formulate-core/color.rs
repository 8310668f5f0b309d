//! Hex color canonicalization.
//!
//! User-facing color fields accept shorthand hex in several lengths; the
//! rest of the crate only ever sees the canonical 6-digit uppercase form
//! with no leading marker. Validation of hex-digit-ness is the caller's
//! concern; this function only expands shorthands.

/// Expand a hex-like string to canonical 6-digit uppercase form.
///
/// A leading `#` is stripped. Expansion rules:
/// - 1 digit: repeated six times (`a` → `AAAAAA`)
/// - 2 digits: repeated three times (`ab` → `ABABAB`)
/// - 3 digits: each digit duplicated pairwise (`abc` → `AABBCC`)
/// - 4+ digits: passed through unchanged (assumed already canonical)
/// - empty input: empty output
pub fn normalize_hex(input: &str) -> String {
  let digits: String = input.strip_prefix('#').unwrap_or(input).to_uppercase();

  match digits.len() {
    0 => digits,
    1 => digits.repeat(6),
    2 => digits.repeat(3),
    3 => {
      let mut out = String::with_capacity(6);
      for c in digits.chars() {
        out.push(c);
        out.push(c);
      }
      out
    },
    _ => digits,
  }
}
