//! Excel serial-date arithmetic.
//!
//! Excel stores dates as day counts from an epoch. Two epochs exist: the
//! 1900 system (serial 1 = 1900-01-01, the default) and the 1904 system
//! (serial 0 = 1904-01-01, classic Mac). The 1900 system also carries the
//! famous phantom leap day: Excel believes 1900-02-29 existed and assigns
//! it serial 60, so serials at or below 60 sit one day apart from the real
//! calendar. Conversion goes through Julian Day Numbers so no date table
//! is needed.

/// Serial for 9999-12-31 in the 1900 system; anything beyond has no
/// calendar representation.
const MAX_SERIAL: f64 = 2_958_465.0;

/// Convert an Excel serial to `(year, month, day)`. The fractional part
/// (time of day) is dropped. Returns `None` for negatives, non-finite
/// values, and serials past year 9999.
pub fn serial_to_ymd(serial: f64, date1904: bool) -> Option<(i32, u32, u32)> {
    if !serial.is_finite() || !(0.0..=MAX_SERIAL).contains(&serial) {
        return None;
    }
    let days = serial.floor() as i64;
    let jdn = if date1904 {
        days + 2_416_481
    } else if days <= 60 {
        // Serials 1..=60 predate the phantom 1900-02-29, so the offset
        // differs by one from the rest of the 1900 system.
        days + 2_415_020
    } else {
        days + 2_415_019
    };
    Some(jdn_to_ymd(jdn))
}

/// Convert a serial to `YYYY-MM-DD`, or `None` when the serial has no
/// calendar representation.
pub fn format_serial_date(serial: f64, date1904: bool) -> Option<String> {
    serial_to_ymd(serial, date1904).map(|(y, m, d)| format!("{y:04}-{m:02}-{d:02}"))
}

/// Gregorian date from a Julian Day Number, pure integer arithmetic
/// (Richards' algorithm).
fn jdn_to_ymd(jdn: i64) -> (i32, u32, u32) {
    const Y: i64 = 4716;
    const J: i64 = 1401;
    const M: i64 = 2;
    const N: i64 = 12;
    const R: i64 = 4;
    const P: i64 = 1461;
    const V: i64 = 3;
    const U: i64 = 5;
    const S: i64 = 153;
    const W: i64 = 2;
    const B: i64 = 274_277;
    const C: i64 = -38;

    let f = jdn + J + (((4 * jdn + B) / 146_097) * 3) / 4 + C;
    let e = R * f + V;
    let g = (e % P) / R;
    let h = U * g + W;
    let day = (h % S) / U + 1;
    let month = (h / S + M) % N + 1;
    let year = e / P - Y + (N + M - month) / N;
    (year as i32, month as u32, day as u32)
}

/// Built-in number formats that render as dates or times.
pub(crate) fn builtin_format_is_date(id: u32) -> bool {
    matches!(id, 14..=22 | 45..=47)
}

/// Whether a custom format code renders as a date or time: any `y`, `m`,
/// `d`, `h` or `s` token that survives after quoted literals, bracketed
/// sections and escaped characters are stripped.
pub(crate) fn is_date_format(code: &str) -> bool {
    let mut chars = code.chars();
    let mut in_quotes = false;
    let mut in_brackets = false;
    while let Some(ch) = chars.next() {
        match ch {
            '"' => in_quotes = !in_quotes,
            _ if in_quotes => {}
            '[' => in_brackets = true,
            ']' => in_brackets = false,
            _ if in_brackets => {}
            '\\' => {
                chars.next();
            }
            'y' | 'Y' | 'm' | 'M' | 'd' | 'D' | 'h' | 'H' | 's' | 'S' => return true,
            _ => {}
        }
    }
    false
}
