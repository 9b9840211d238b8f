use crate::error::ParseError;
use crate::location::Location;

/// Parse free-text player input into a [`Location`].
///
/// Accepts `"lat, lon"` or `"lat lon"`. The first number is always the
/// latitude and the second the longitude; the order is never inferred.
pub fn parse(raw: &str) -> Result<Location, ParseError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(ParseError::Empty);
    }

    let tokens: Vec<&str> = if text.contains(',') {
        text.split(',').map(str::trim).collect()
    } else {
        text.split_whitespace().collect()
    };

    if tokens.len() != 2 {
        return Err(ParseError::WrongArity(tokens.len()));
    }

    let latitude = parse_number(tokens[0])?;
    let longitude = parse_number(tokens[1])?;

    Location::new(latitude, longitude)
}

fn parse_number(token: &str) -> Result<f64, ParseError> {
    match token.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(ParseError::NotANumber(token.to_string())),
    }
}
