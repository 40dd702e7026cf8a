//! 组局信息抽取
//!
//! 把自然语言描述交给 LLM 转成结构化字段，再校验字段是否齐全

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use promptplay_adapter_llm::{ChatRequest, LlmClient, LlmPurpose, parse_json_reply};
use promptplay_errors::{AppError, AppResult};
use serde_json::{Map, Value, json};
use tracing::{debug, instrument};

use crate::domain::GameDetails;

pub const MISSING_INFORMATION: &str = "Missing required information";

/// 组局必须包含的字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredField {
    Sport,
    Location,
    Datetime,
    PlayersNeeded,
}

impl RequiredField {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sport => "sport",
            Self::Location => "location",
            Self::Datetime => "datetime",
            Self::PlayersNeeded => "players_needed",
        }
    }

    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::Sport => {
                "Please specify what sport you want to play (e.g., tennis, football, basketball)"
            }
            Self::Location => {
                "Please specify where you want to play (e.g., The Meadows, Holyrood Park)"
            }
            Self::Datetime => {
                "Please specify when you want to play (e.g., tomorrow 4pm, this Wednesday afternoon)"
            }
            Self::PlayersNeeded => {
                "Please specify how many players you need (e.g., need 2 more players, for 3 people)"
            }
        }
    }
}

/// 缺失字段集合，顺序固定为 sport、location、datetime、players_needed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingFields(pub Vec<RequiredField>);

impl MissingFields {
    pub fn names(&self) -> Vec<&'static str> {
        self.0.iter().map(RequiredField::name).collect()
    }

    /// 前导空格加上以空格拼接的建议句子
    pub fn suggestions(&self) -> String {
        let sentences: Vec<&str> = self.0.iter().map(RequiredField::suggestion).collect();
        format!(" {}", sentences.join(" "))
    }

    pub fn into_error(self, prompt: &str) -> AppError {
        AppError::incomplete_request(
            MISSING_INFORMATION,
            json!({
                "error": MISSING_INFORMATION,
                "missing_fields": self.names(),
                "suggestions": self.suggestions(),
                "your_prompt": prompt,
            }),
        )
    }
}

/// 抽取用的 system prompt，需要告知模型当前时间以便换算相对日期
pub fn extraction_system_prompt(now: DateTime<Utc>) -> String {
    format!(
        r#"You are an assistant that converts natural language requests into structured JSON.
Extract the following information from the user's prompt:
- sport (e.g., "tennis", "football", "basketball")
- location (e.g., "The Meadows, Edinburgh", "Holyrood Park")
- datetime_utc (convert relative terms like "tomorrow", "this Wednesday 4pm" to ISO format datetime. Today is {})
- players_needed (if they say "for 2 people", they need 1 more player. If they say "need 3 players", then players_needed is 3)

Respond ONLY with valid JSON in this exact format:
{{
    "sport": "string",
    "location": "string",
    "datetime_utc": "ISO datetime string",
    "players_needed": number
}}

Do not include any explanation or markdown formatting."#,
        now.format("%Y-%m-%d %H:%M:%S")
    )
}

/// 解析 ISO-8601 时间，不带时区的按 UTC 处理
pub fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    const NAIVE_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ];
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn text_field(data: &Map<String, Value>, key: &str) -> Option<String> {
    let text = data.get(key)?.as_str()?.trim();
    if text.is_empty() || text.eq_ignore_ascii_case("unknown") || text.eq_ignore_ascii_case("null")
    {
        return None;
    }
    Some(text.to_string())
}

fn players_field(data: &Map<String, Value>) -> Option<i32> {
    let count = match data.get("players_needed")? {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0)
                .map(|f| f as i64)
        })?,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    i32::try_from(count).ok().filter(|n| *n > 0)
}

/// 校验 LLM 抽取结果
pub fn validate_extraction(data: &Map<String, Value>) -> Result<GameDetails, MissingFields> {
    let sport = text_field(data, "sport");
    let location = text_field(data, "location");
    let datetime_utc = text_field(data, "datetime_utc").and_then(|s| parse_datetime(&s));
    let players_needed = players_field(data);

    match (sport, location, datetime_utc, players_needed) {
        (Some(sport), Some(location), Some(datetime_utc), Some(players_needed)) => {
            Ok(GameDetails {
                sport,
                location,
                datetime_utc,
                players_needed,
            })
        }
        (sport, location, datetime_utc, players_needed) => {
            let mut missing = Vec::new();
            if sport.is_none() {
                missing.push(RequiredField::Sport);
            }
            if location.is_none() {
                missing.push(RequiredField::Location);
            }
            if datetime_utc.is_none() {
                missing.push(RequiredField::Datetime);
            }
            if players_needed.is_none() {
                missing.push(RequiredField::PlayersNeeded);
            }
            Err(MissingFields(missing))
        }
    }
}

/// 抽取服务
pub struct ExtractionService {
    llm: Arc<dyn LlmClient>,
    temperature: f32,
}

impl ExtractionService {
    pub fn new(llm: Arc<dyn LlmClient>, temperature: f32) -> Self {
        Self { llm, temperature }
    }

    /// 从描述中抽取组局信息
    pub async fn extract(&self, prompt: &str) -> AppResult<GameDetails> {
        self.extract_at(prompt, Utc::now()).await
    }

    #[instrument(skip(self, prompt), fields(prompt_len = prompt.len()))]
    pub async fn extract_at(&self, prompt: &str, now: DateTime<Utc>) -> AppResult<GameDetails> {
        let request = ChatRequest::new(
            LlmPurpose::Extraction,
            extraction_system_prompt(now),
            prompt,
            self.temperature,
        );
        let reply = self.llm.complete(request).await?;

        let data: Map<String, Value> = parse_json_reply(&reply).map_err(|_| {
            AppError::external_service(format!("Failed to parse LLM response: {}", reply))
        })?;

        match validate_extraction(&data) {
            Ok(details) => {
                debug!(sport = %details.sport, players_needed = details.players_needed, "Game details extracted");
                Ok(details)
            }
            Err(missing) => {
                debug!(missing = ?missing.names(), "Extracted game request is incomplete");
                Err(missing.into_error(prompt))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use mockall::{mock, predicate};

    mock! {
        Llm {}

        #[async_trait]
        impl LlmClient for Llm {
            async fn complete(&self, request: ChatRequest) -> AppResult<String>;
        }
    }

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn service_replying(reply: &'static str) -> ExtractionService {
        let mut llm = MockLlm::new();
        llm.expect_complete()
            .times(1)
            .returning(move |_| Ok(reply.to_string()));
        ExtractionService::new(Arc::new(llm), 0.3)
    }

    #[test]
    fn test_parse_datetime_variants() {
        let expected = Utc.with_ymd_and_hms(2025, 6, 1, 16, 0, 0).unwrap();
        assert_eq!(parse_datetime("2025-06-01T16:00:00Z"), Some(expected));
        assert_eq!(parse_datetime("2025-06-01T16:00:00+00:00"), Some(expected));
        assert_eq!(parse_datetime("2025-06-01T17:00:00+01:00"), Some(expected));
        assert_eq!(parse_datetime("2025-06-01T16:00:00"), Some(expected));
        assert_eq!(parse_datetime("2025-06-01T16:00:00.000"), Some(expected));
        assert_eq!(parse_datetime("2025-06-01 16:00:00"), Some(expected));
        assert_eq!(parse_datetime("2025-06-01T16:00"), Some(expected));
        assert_eq!(
            parse_datetime("2025-06-01"),
            Some(Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_datetime("tomorrow 4pm"), None);
    }

    #[test]
    fn test_validate_complete_extraction() {
        let data = object(json!({
            "sport": "tennis",
            "location": "The Meadows",
            "datetime_utc": "2025-06-01T16:00:00Z",
            "players_needed": 1
        }));

        let details = validate_extraction(&data).unwrap();
        assert_eq!(details.sport, "tennis");
        assert_eq!(details.location, "The Meadows");
        assert_eq!(details.players_needed, 1);
    }

    #[test]
    fn test_placeholder_values_count_as_missing() {
        let data = object(json!({
            "sport": "unknown",
            "location": "null",
            "datetime_utc": "",
            "players_needed": 0
        }));

        let missing = validate_extraction(&data).unwrap_err();
        assert_eq!(
            missing.names(),
            vec!["sport", "location", "datetime", "players_needed"]
        );
    }

    #[test]
    fn test_missing_keys_and_nulls() {
        let data = object(json!({
            "sport": "football",
            "location": null,
            "datetime_utc": "2025-06-01T16:00:00Z"
        }));

        let missing = validate_extraction(&data).unwrap_err();
        assert_eq!(missing.names(), vec!["location", "players_needed"]);
        assert_eq!(
            missing.suggestions(),
            " Please specify where you want to play (e.g., The Meadows, Holyrood Park) \
             Please specify how many players you need (e.g., need 2 more players, for 3 people)"
        );
    }

    #[test]
    fn test_unparseable_datetime_is_missing() {
        let data = object(json!({
            "sport": "tennis",
            "location": "Holyrood Park",
            "datetime_utc": "next week sometime",
            "players_needed": 2
        }));

        assert_eq!(validate_extraction(&data).unwrap_err().names(), vec!["datetime"]);
    }

    #[test]
    fn test_players_needed_forms() {
        let base = |players: Value| {
            object(json!({
                "sport": "tennis",
                "location": "Holyrood Park",
                "datetime_utc": "2025-06-01T16:00:00Z",
                "players_needed": players
            }))
        };

        assert_eq!(validate_extraction(&base(json!(3))).unwrap().players_needed, 3);
        assert_eq!(validate_extraction(&base(json!(2.0))).unwrap().players_needed, 2);
        assert_eq!(validate_extraction(&base(json!("4"))).unwrap().players_needed, 4);
        assert!(validate_extraction(&base(json!(-1))).is_err());
        assert!(validate_extraction(&base(json!(1.5))).is_err());
        assert!(validate_extraction(&base(json!(true))).is_err());
    }

    #[test]
    fn test_system_prompt_mentions_today() {
        let now = Utc.with_ymd_and_hms(2025, 3, 4, 10, 30, 0).unwrap();
        let prompt = extraction_system_prompt(now);
        assert!(prompt.contains("Today is 2025-03-04 10:30:00"));
        assert!(prompt.contains("\"players_needed\": number"));
    }

    #[tokio::test]
    async fn test_extract_sends_prompt_with_extraction_purpose() {
        let mut llm = MockLlm::new();
        llm.expect_complete()
            .with(predicate::function(|request: &ChatRequest| {
                request.purpose == LlmPurpose::Extraction
                    && request.user == "Tennis tomorrow 4pm at The Meadows, need 1 more"
                    && (request.temperature - 0.3).abs() < f32::EPSILON
            }))
            .times(1)
            .returning(|_| {
                Ok(r#"{"sport":"tennis","location":"The Meadows","datetime_utc":"2025-06-02T16:00:00","players_needed":1}"#.to_string())
            });

        let service = ExtractionService::new(Arc::new(llm), 0.3);
        let details = service
            .extract("Tennis tomorrow 4pm at The Meadows, need 1 more")
            .await
            .unwrap();

        assert_eq!(details.sport, "tennis");
        assert_eq!(
            details.datetime_utc,
            Utc.with_ymd_and_hms(2025, 6, 2, 16, 0, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn test_extract_accepts_fenced_reply() {
        let service = service_replying(
            "```json\n{\"sport\":\"football\",\"location\":\"Bruntsfield Links\",\"datetime_utc\":\"2025-06-02T18:00:00Z\",\"players_needed\":5}\n```",
        );

        let details = service.extract("Football at Bruntsfield").await.unwrap();
        assert_eq!(details.players_needed, 5);
    }

    #[tokio::test]
    async fn test_extract_incomplete_request() {
        let service = service_replying(
            r#"{"sport":"tennis","location":"unknown","datetime_utc":null,"players_needed":null}"#,
        );

        let err = service.extract("I want to play tennis").await.unwrap_err();
        match err {
            AppError::IncompleteRequest { message, details } => {
                assert_eq!(message, MISSING_INFORMATION);
                assert_eq!(details["error"], MISSING_INFORMATION);
                assert_eq!(
                    details["missing_fields"],
                    json!(["location", "datetime", "players_needed"])
                );
                assert_eq!(details["your_prompt"], "I want to play tennis");
                assert!(details["suggestions"].as_str().unwrap().starts_with(" Please"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_extract_non_json_reply() {
        let service = service_replying("Sorry, I can't help with that.");

        let err = service.extract("tennis").await.unwrap_err();
        match err {
            AppError::ExternalService(message) => {
                assert_eq!(
                    message,
                    "Failed to parse LLM response: Sorry, I can't help with that."
                );
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_extract_propagates_llm_failure() {
        let mut llm = MockLlm::new();
        llm.expect_complete()
            .returning(|_| Err(AppError::external_service("LLM API error: 503")));

        let service = ExtractionService::new(Arc::new(llm), 0.3);
        let err = service.extract("tennis").await.unwrap_err();
        assert!(matches!(err, AppError::ExternalService(_)));
    }
}
