//! Display formatting for KPI cards and insight text.

/// Format a currency amount rounded to whole units, e.g. `$ 12,346`.
pub fn currency(x: f64) -> String {
    let rounded = x.round();
    if rounded < 0.0 {
        format!("$ -{}", group_thousands(-rounded as u64))
    } else {
        format!("$ {}", group_thousands(rounded as u64))
    }
}

/// Format a count with thousands separators.
pub fn count(n: i64) -> String {
    if n < 0 {
        format!("-{}", group_thousands(n.unsigned_abs()))
    } else {
        group_thousands(n as u64)
    }
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    let offset = digits.len() % 3;
    for (i, ch) in digits.chars().enumerate() {
        if i != 0 && (i % 3) == (offset % 3) {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_thousands() {
        assert_eq!(count(0), "0");
        assert_eq!(count(999), "999");
        assert_eq!(count(1_000), "1,000");
        assert_eq!(count(34_500), "34,500");
        assert_eq!(count(1_234_567), "1,234,567");
        assert_eq!(count(-4_200), "-4,200");
    }

    #[test]
    fn currency_rounds_to_whole_units() {
        assert_eq!(currency(12345.6), "$ 12,346");
        assert_eq!(currency(0.4), "$ 0");
        assert_eq!(currency(-1500.0), "$ -1,500");
    }
}
