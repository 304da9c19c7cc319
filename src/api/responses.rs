use serde::Deserialize;

/// The JSON body returned by a DNS-over-HTTPS resolver
/// ([Google JSON API](https://developers.google.com/speed/public-dns/docs/doh/json))
#[derive(Debug, Deserialize)]
pub struct Resolve {
    /// The DNS response code, `0` meaning no error
    #[serde(rename = "Status", default)]
    pub status: u16,
    /// The answers to the question, missing if there are none
    #[serde(rename = "Answer", default)]
    pub answer: Vec<Answer>,
}

/// A single resource record of a DNS-over-HTTPS answer
#[derive(Debug, Deserialize)]
pub struct Answer {
    /// The owner name of the record
    #[serde(default)]
    pub name: String,
    /// The record type as its numeric code
    #[serde(rename = "type", default)]
    pub type_: u16,
    /// The record data, TXT values are quoted
    pub data: String,
}

impl Resolve {
    /// The first answer's data without its surrounding quotes
    pub fn first_value(&self) -> Option<String> {
        self.answer
            .first()
            .map(|answer| answer.data.trim_matches('"').to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::Resolve;

    #[test]
    fn first_value_strips_quotes() {
        let body = r#"{
            "Status": 0,
            "Answer": [
                {"name": "example.duckdns.org.", "type": 16, "TTL": 60, "data": "\"first\""},
                {"name": "example.duckdns.org.", "type": 16, "TTL": 60, "data": "\"second\""}
            ]
        }"#;

        let resolve = serde_json::from_str::<Resolve>(body).unwrap();
        assert_eq!(resolve.status, 0);
        assert_eq!(resolve.answer[0].type_, 16);
        assert_eq!(resolve.first_value().as_deref(), Some("first"));
    }

    #[test]
    fn missing_answer() {
        let resolve = serde_json::from_str::<Resolve>(r#"{"Status": 3}"#).unwrap();
        assert_eq!(resolve.first_value(), None);

        let resolve = serde_json::from_str::<Resolve>(r#"{"Status": 0, "Answer": []}"#).unwrap();
        assert_eq!(resolve.first_value(), None);
    }
}
