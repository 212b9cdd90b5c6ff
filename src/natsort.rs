use std::cmp::Ordering;

/// One component of a natural sort key.
///
/// Variant order matters: at any position a number sorts before text, which
/// keeps the ordering total when keys of different shapes are compared.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum NaturalToken {
    /// A run of decimal digits, stored without leading zeros. Comparing the
    /// length first gives numeric order without overflow.
    Number { len: usize, digits: String },
    /// A run of non-digits, lower-cased.
    Text(String),
}

/// Split `s` into alternating digit and non-digit runs.
pub fn natural_key(s: &str) -> Vec<NaturalToken> {
    let mut key = Vec::new();
    let mut run = String::new();
    let mut in_digits = false;

    for c in s.chars() {
        let is_digit = c.is_ascii_digit();
        if !run.is_empty() && is_digit != in_digits {
            key.push(make_token(&run, in_digits));
            run.clear();
        }
        in_digits = is_digit;
        run.push(c);
    }
    if !run.is_empty() {
        key.push(make_token(&run, in_digits));
    }
    key
}

fn make_token(run: &str, digits: bool) -> NaturalToken {
    if digits {
        let trimmed = run.trim_start_matches('0');
        NaturalToken::Number {
            len: trimmed.len(),
            digits: trimmed.to_string(),
        }
    } else {
        NaturalToken::Text(run.to_lowercase())
    }
}

pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    natural_key(a).cmp(&natural_key(b))
}

/// Stable, ascending natural sort (`chr2` before `chr10`).
pub fn natural_sort<T: AsRef<str>>(items: &mut [T]) {
    items.sort_by_cached_key(|item| natural_key(item.as_ref()));
}
