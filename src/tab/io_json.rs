use crate::tab::*;

/// Reads an array of responses, as exported by the storage layer.
pub fn read_json_responses(path: &str) -> BTabResult<Vec<Response>> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu {
        path: path.to_string(),
    })?;
    let responses: Vec<Response> =
        serde_json::from_str(&contents).context(ParsingJsonSnafu {})?;
    debug!(
        "read_json_responses: {}: {} responses",
        path,
        responses.len()
    );
    Ok(responses)
}
