//! # Display helpers
//! Text formatting for the price board. Missing data renders as an explicit
//! placeholder, never as a stale or made-up number.

use crate::ingest::SourcePoll;
use crate::quote::{CanonicalQuote, Product};

/// Shown in place of a missing price.
pub const PLACEHOLDER: &str = "--";

fn separators(locale: &str) -> (char, char) {
    let lang = locale.split(['-', '_']).next().unwrap_or_default();
    if ["vi", "de", "id", "es", "it", "nl"]
        .iter()
        .any(|l| lang.eq_ignore_ascii_case(l))
    {
        ('.', ',')
    } else {
        (',', '.')
    }
}

fn group_digits(digits: &str, sep: char) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(sep);
        }
        out.push(ch);
    }
    out
}

/// Locale-grouped price with at most three decimals, e.g. `84.500.000` or
/// `2.812,5` for `vi-VN`. Missing, zero and non-numeric prices give [`PLACEHOLDER`].
pub fn format_price(price: Option<f64>, locale: &str) -> String {
    let p = match price {
        Some(p) if p.is_finite() && p != 0.0 => p,
        _ => return PLACEHOLDER.to_string(),
    };
    let (group, decimal) = separators(locale);

    let text = format!("{:.3}", p.abs());
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), ""));
    let frac = frac_part.trim_end_matches('0');

    let mut out = String::new();
    if p < 0.0 {
        out.push('-');
    }
    out.push_str(&group_digits(int_part, group));
    if !frac.is_empty() {
        out.push(decimal);
        out.push_str(frac);
    }
    out
}

/// Signed percentage with two decimals (`+0.15%`), empty when unknown.
pub fn format_change(percent: Option<f64>) -> String {
    match percent {
        Some(p) if p.is_finite() => {
            let sign = if p > 0.0 { "+" } else { "" };
            format!("{sign}{p:.2}%")
        }
        _ => String::new(),
    }
}

fn board_line(vendor: &str, product: Product, quote: Option<&CanonicalQuote>, locale: &str) -> String {
    format!(
        "{:<8} {:<11} {:>14} {:>14} {:>8}",
        vendor,
        product.label(),
        format_price(quote.map(|q| q.buy), locale),
        format_price(quote.map(|q| q.sell), locale),
        format_change(quote.and_then(|q| q.change_percent)),
    )
}

/// Plain-text board: one line per vendor and product, placeholders for gaps.
pub fn render_board(polls: &[SourcePoll], locale: &str) -> String {
    let mut lines = vec![format!(
        "{:<8} {:<11} {:>14} {:>14} {:>8}",
        "Nguồn", "Sản phẩm", "Mua", "Bán", "+/-"
    )];
    for poll in polls {
        for product in Product::ALL {
            let quote = poll.quotes.as_ref().and_then(|s| s.get(product));
            lines.push(board_line(poll.source.label(), product, quote, locale));
        }
    }
    lines.join("\n")
}
