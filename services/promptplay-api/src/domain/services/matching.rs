//! 语义匹配
//!
//! 对每个开放组局调用一次 LLM，判断新描述与已有组局是否合得来

use std::sync::Arc;

use futures::{StreamExt, TryStreamExt, stream};
use promptplay_adapter_llm::{ChatRequest, LlmClient, LlmPurpose, parse_json_reply};
use promptplay_errors::AppResult;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::domain::GameView;

pub const MATCHING_SYSTEM_PROMPT: &str = r#"You are a matching assistant that determines if two game requests are compatible.
Consider factors like:
- Same or compatible sport
- Similar location (nearby areas are OK)
- Compatible timing (similar dates/times, allow some flexibility)
- Overall intent and context

Respond ONLY with valid JSON in this exact format:
{
    "is_match": true or false,
    "compatibility_score": number from 0-100,
    "reason": "brief explanation"
}

Do not include any explanation or markdown formatting."#;

/// 匹配用的 user 消息：引用新描述和已有组局的原文及字段
pub fn matching_user_message(prompt: &str, candidate: &GameView) -> String {
    let game = &candidate.game;
    format!(
        "New request: \"{}\"\n\nExisting post: \"{}\"\nSport: {}\nLocation: {}\nTime: {}\nPlayers needed: {}\n\nAre these a good match?",
        prompt,
        game.original_prompt,
        game.sport,
        game.location,
        game.datetime_utc.format("%Y-%m-%d %H:%M:%S UTC"),
        game.players_needed
    )
}

/// 模型给出的判断
#[derive(Debug, Clone, Deserialize)]
struct MatchVerdict {
    #[serde(default)]
    is_match: bool,
    #[serde(default)]
    compatibility_score: f64,
    #[serde(default)]
    reason: String,
}

/// 匹配结果
#[derive(Debug, Clone, PartialEq)]
pub struct GameMatch {
    pub game: GameView,
    /// 0-100
    pub compatibility_score: u8,
    pub reason: String,
}

fn clamp_score(score: f64) -> u8 {
    if score.is_nan() {
        return 0;
    }
    score.round().clamp(0.0, 100.0) as u8
}

/// 匹配服务
pub struct MatchingService {
    llm: Arc<dyn LlmClient>,
    temperature: f32,
    concurrency: usize,
}

impl MatchingService {
    pub fn new(llm: Arc<dyn LlmClient>, temperature: f32, concurrency: usize) -> Self {
        Self {
            llm,
            temperature,
            concurrency: concurrency.max(1),
        }
    }

    /// 返回匹配成功的组局，按匹配度从高到低排列（同分保持输入顺序）
    #[instrument(skip(self, prompt, candidates), fields(candidates = candidates.len()))]
    pub async fn find_matches(
        &self,
        prompt: &str,
        candidates: Vec<GameView>,
    ) -> AppResult<Vec<GameMatch>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let judgements: Vec<_> = candidates
            .iter()
            .map(|candidate| self.judge(prompt, candidate))
            .collect();
        let verdicts: Vec<Option<MatchVerdict>> = stream::iter(judgements)
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        let mut matches: Vec<GameMatch> = candidates
            .into_iter()
            .zip(verdicts)
            .filter_map(|(game, verdict)| match verdict {
                Some(verdict) if verdict.is_match => Some(GameMatch {
                    game,
                    compatibility_score: clamp_score(verdict.compatibility_score),
                    reason: verdict.reason,
                }),
                _ => None,
            })
            .collect();

        matches.sort_by(|a, b| b.compatibility_score.cmp(&a.compatibility_score));

        debug!(matches = matches.len(), "Match search finished");
        Ok(matches)
    }

    /// 单个候选的判断，回复无法解析时跳过该候选
    async fn judge(&self, prompt: &str, candidate: &GameView) -> AppResult<Option<MatchVerdict>> {
        let request = ChatRequest::new(
            LlmPurpose::Matching,
            MATCHING_SYSTEM_PROMPT,
            matching_user_message(prompt, candidate),
            self.temperature,
        );
        let reply = self.llm.complete(request).await?;

        match parse_json_reply::<MatchVerdict>(&reply) {
            Ok(verdict) => Ok(Some(verdict)),
            Err(e) => {
                warn!(
                    game_id = %candidate.game.id,
                    error = %e,
                    "Skipping malformed match reply"
                );
                Ok(None)
            }
        }
    }
}
