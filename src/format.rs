//! Number formatting for panel readouts.

/// Format `v` to `sf` significant figures without ever using scientific
/// notation.
///
/// Large values are padded with trailing zeros (`12345 → "12300"` at 3 s.f.),
/// small ones with leading zeros after the decimal point.  Zero prints as
/// `"0."` followed by `sf` zeros.  Non-finite values print as Rust formats
/// them (`NaN`, `inf`).
pub fn sig_figs(v: f64, sf: usize) -> String {
    if !v.is_finite() {
        return v.to_string();
    }
    if v < 0.0 {
        return format!("-{}", sig_figs(-v, sf));
    }
    let sf = sf.max(1);
    if v == 0.0 {
        return format!("0.{}", "0".repeat(sf));
    }

    // Round first: 9.99 at 2 s.f. must be formatted as the 2-digit "10".
    let magnitude = v.log10().floor() as i32;
    let unit = 10f64.powi(magnitude + 1 - sf as i32);
    let rounded = (v / unit).round() * unit;
    let magnitude = rounded.log10().floor() as i32;

    let decimals = sf as i32 - 1 - magnitude;
    if decimals >= 0 {
        format!("{:.*}", decimals as usize, rounded)
    } else {
        let unit = 10f64.powi(-decimals);
        format!("{:.0}", (rounded / unit).round() * unit)
    }
}
