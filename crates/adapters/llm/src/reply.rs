//! 模型回复解析

use serde::de::DeserializeOwned;

/// 去掉回复外层的 Markdown 代码块（```json ... ```）
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // 第一行是语言标记
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or(rest);
    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// 把模型回复解析为 JSON 对象
///
/// 要求模型只返回 JSON，但模型偶尔会在前后加说明文字或代码块，
/// 此时退而截取第一个 `{` 到最后一个 `}` 之间的内容。
pub fn parse_json_reply<T: DeserializeOwned>(raw: &str) -> Result<T, serde_json::Error> {
    let candidate = strip_code_fence(raw);
    match serde_json::from_str(candidate) {
        Ok(value) => Ok(value),
        Err(err) => match (candidate.find('{'), candidate.rfind('}')) {
            (Some(start), Some(end)) if start < end => {
                serde_json::from_str(&candidate[start..=end]).map_err(|_| err)
            }
            _ => Err(err),
        },
    }
}
