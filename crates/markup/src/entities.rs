//! Bounded scanning of character and entity references.
//!
//! The formatter never rewrites a reference: `&amp;` in the input stays
//! `&amp;` in the output. What the tokenizer needs is the *extent* of a
//! reference so it can keep the span intact across chunk boundaries and
//! refuse to treat a bare `&` as one.
//!
//! Contract:
//! - Named references: `&name;` where `name` is ASCII alphabetic followed by
//!   ASCII alphanumerics, at most `MAX_NAME_LEN` characters. No name table is
//!   consulted; an unknown-but-well-formed name still scans as a reference
//!   because it round-trips verbatim either way.
//! - Numeric references: `&#123;` and `&#x1F4A9;`, semicolon-terminated, with
//!   digit-run limits to avoid quadratic behavior on adversarial input.
//! - Anything else starting at `&` is not a reference.

/// Result of scanning at a `&`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RefScan {
    /// A well-formed reference ends at this index (one past the `;`).
    Complete(usize),
    /// The buffer ends before the reference can be classified; with more
    /// input it could still complete.
    Incomplete,
    /// Not a reference. The `&` is literal text.
    Invalid,
}

const MAX_NAME_LEN: usize = 32;
const MAX_HEX_DIGITS: usize = 6; // 0x10FFFF
const MAX_DEC_DIGITS: usize = 7; // 1114111

/// Scan a candidate reference starting at `bytes[start]`, which must be `&`.
pub(crate) fn scan_reference(bytes: &[u8], start: usize) -> RefScan {
    debug_assert!(bytes.get(start) == Some(&b'&'));
    let mut i = start + 1;

    if i >= bytes.len() {
        return RefScan::Incomplete;
    }

    if bytes[i] == b'#' {
        i += 1;
        let (is_hex, max_digits) = match bytes.get(i) {
            Some(b'x') | Some(b'X') => {
                i += 1;
                (true, MAX_HEX_DIGITS)
            }
            Some(_) => (false, MAX_DEC_DIGITS),
            None => return RefScan::Incomplete,
        };
        let mut digits = 0usize;
        while i < bytes.len() {
            let b = bytes[i];
            if b == b';' {
                return if digits > 0 {
                    RefScan::Complete(i + 1)
                } else {
                    RefScan::Invalid
                };
            }
            if digits == max_digits {
                return RefScan::Invalid;
            }
            let ok = if is_hex {
                b.is_ascii_hexdigit()
            } else {
                b.is_ascii_digit()
            };
            if !ok {
                return RefScan::Invalid;
            }
            digits += 1;
            i += 1;
        }
        return RefScan::Incomplete;
    }

    if !bytes[i].is_ascii_alphabetic() {
        return RefScan::Invalid;
    }
    let mut len = 0usize;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b';' {
            return RefScan::Complete(i + 1);
        }
        if len == MAX_NAME_LEN || !b.is_ascii_alphanumeric() {
            return RefScan::Invalid;
        }
        len += 1;
        i += 1;
    }
    RefScan::Incomplete
}
