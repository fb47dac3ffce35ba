use core::num::NonZeroU32;

pub fn parse_nonzero_num(
    s: &str,
) -> ::core::result::Result<u32, <NonZeroU32 as ::core::str::FromStr>::Err> {
    Ok(s.parse::<NonZeroU32>()?.get())
}

pub fn parse_score(s: &str) -> ::core::result::Result<f64, String> {
    let score = s.parse::<f64>().map_err(|e| e.to_string())?;

    match (0.0..=5.0).contains(&score) {
        true => Ok(score),
        false => Err(format!("score must be between 0 and 5: {}", score)),
    }
}

#[test]
fn parse_test() {
    assert_eq!(parse_nonzero_num("3"), Ok(3));
    assert!(parse_nonzero_num("0").is_err());

    assert_eq!(parse_score("4.5"), Ok(4.5));
    assert!(parse_score("6").is_err());
    assert!(parse_score("NaN").is_err());
}
