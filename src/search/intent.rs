//! 查询意图分类：把自由文本查询映射到一种互斥的搜索策略。
//! 规则按固定优先级检查，先命中者生效，不回溯。

use serde::Serialize;

use crate::geo::gazetteer;
use crate::search::taxonomy;

/// 搜索策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchIntent {
    Browse,
    ExactName,
    LocationSpecific,
    CategoryNearby,
    GeneralText,
}

impl SearchIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchIntent::Browse => "browse",
            SearchIntent::ExactName => "exact_name",
            SearchIntent::LocationSpecific => "location_specific",
            SearchIntent::CategoryNearby => "category_nearby",
            SearchIntent::GeneralText => "general_text",
        }
    }
}

/// 一次查询的意图分析结果
#[derive(Debug, Clone)]
pub struct SearchAnalysis {
    pub original_query: String,
    pub intent: SearchIntent,
    /// 去掉地名、引号之后的剩余查询词
    pub clean_query: String,
    /// 从查询中提取出的地名
    pub location: Option<String>,
    pub confidence: f64,
}

const LOCATION_PREPOSITIONS: &[&str] = &["in", "at", "around", "near"];
const LOCATION_DESCRIPTORS: &[&str] = &["based", "area", "region", "zone"];

/// 识别查询意图。优先级：精确名称 > 地名查询 > 附近分类 > 普通文本
pub fn classify(raw_query: &str, has_user_location: bool) -> SearchAnalysis {
    let trimmed = raw_query.trim();

    if trimmed.is_empty() {
        return SearchAnalysis {
            original_query: raw_query.to_string(),
            intent: SearchIntent::Browse,
            clean_query: String::new(),
            location: None,
            confidence: 0.0,
        };
    }

    let lower = trimmed.to_lowercase();

    if is_exact_name_query(trimmed) {
        let clean: String = trimmed.chars().filter(|c| *c != '"' && *c != '\'').collect();
        return SearchAnalysis {
            original_query: raw_query.to_string(),
            intent: SearchIntent::ExactName,
            clean_query: clean.trim().to_string(),
            location: None,
            confidence: 0.9,
        };
    }

    if let Some((location, clean)) = extract_location(&lower) {
        return SearchAnalysis {
            original_query: raw_query.to_string(),
            intent: SearchIntent::LocationSpecific,
            clean_query: clean,
            location: Some(location),
            confidence: 0.8,
        };
    }

    if taxonomy::is_category_query(&lower) && has_user_location {
        return SearchAnalysis {
            original_query: raw_query.to_string(),
            intent: SearchIntent::CategoryNearby,
            clean_query: lower,
            location: None,
            confidence: 0.7,
        };
    }

    SearchAnalysis {
        original_query: raw_query.to_string(),
        intent: SearchIntent::GeneralText,
        clean_query: trimmed.to_string(),
        location: None,
        confidence: 0.5,
    }
}

/// 是否按精确名称查询处理：带引号，或者看起来是以机构后缀
/// 结尾的专有名词（首词大写区分 "Lagos University" 和 "tennis club"）
fn is_exact_name_query(query: &str) -> bool {
    let quoted = (query.starts_with('"') && query.ends_with('"') && query.len() >= 2)
        || (query.starts_with('\'') && query.ends_with('\'') && query.len() >= 2);
    if quoted {
        return true;
    }

    let tokens: Vec<&str> = query.split_whitespace().collect();
    if tokens.len() < 2 {
        return false;
    }
    let Some(last) = tokens.last() else {
        return false;
    };
    if !taxonomy::EXACT_NAME_SUFFIXES.contains(&last.to_lowercase().as_str()) {
        return false;
    }
    tokens[0].chars().next().is_some_and(|c| c.is_uppercase())
}

/// 从查询中提取已知地名，返回（地名，剩余查询）
fn extract_location(query: &str) -> Option<(String, String)> {
    let tokens: Vec<&str> = query.split_whitespace().collect();
    if tokens.is_empty() {
        return None;
    }

    // "church in enugu" 形式
    for i in (0..tokens.len().saturating_sub(1)).rev() {
        if LOCATION_PREPOSITIONS.contains(&tokens[i]) {
            let candidate = tokens[i + 1..].join(" ");
            if gazetteer::is_known_place(&candidate) {
                return Some((candidate, tokens[..i].join(" ")));
            }
        }
    }

    // "lagos based" / "enugu area" 形式
    if tokens.len() >= 2 {
        if let Some(last) = tokens.last() {
            if LOCATION_DESCRIPTORS.contains(last) {
                let body = &tokens[..tokens.len() - 1];
                // 先尝试两个词的地名再尝试一个
                for take in [body.len().min(2), 1] {
                    if take == 0 || take > body.len() {
                        continue;
                    }
                    let candidate = body[body.len() - take..].join(" ");
                    if gazetteer::is_known_place(&candidate) {
                        return Some((candidate, body[..body.len() - take].join(" ")));
                    }
                }
            }
        }
    }

    // 查询末尾直接带地名（"church lagos"、"events port harcourt"）
    for take in [2usize, 1] {
        if tokens.len() >= take {
            let candidate = tokens[tokens.len() - take..].join(" ");
            if gazetteer::is_known_place(&candidate) {
                return Some((candidate, tokens[..tokens.len() - take].join(" ")));
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_query_is_browse() {
        let analysis = classify("", false);
        assert_eq!(analysis.intent, SearchIntent::Browse);
        let analysis = classify("   ", true);
        assert_eq!(analysis.intent, SearchIntent::Browse);
    }

    #[test]
    fn quoted_query_is_exact_name() {
        let analysis = classify("\"Igbo Union Berlin\"", false);
        assert_eq!(analysis.intent, SearchIntent::ExactName);
        assert_eq!(analysis.clean_query, "Igbo Union Berlin");
        assert!((analysis.confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn institutional_suffix_beats_place_name() {
        // "Lagos University" 同时包含地名和机构后缀，精确名称优先
        let analysis = classify("Lagos University", false);
        assert_eq!(analysis.intent, SearchIntent::ExactName);
        assert_eq!(analysis.clean_query, "Lagos University");
        assert!(analysis.location.is_none());
    }

    #[test]
    fn lowercase_category_phrase_is_not_exact_name() {
        // 小写的 "tennis club" 不是专有名词
        let with_location = classify("tennis club", true);
        assert_eq!(with_location.intent, SearchIntent::CategoryNearby);
        assert!((with_location.confidence - 0.7).abs() < 1e-9);

        let without_location = classify("tennis club", false);
        assert_eq!(without_location.intent, SearchIntent::GeneralText);
        assert!((without_location.confidence - 0.5).abs() < 1e-9);
    }

    #[test]
    fn prepositional_place_is_extracted() {
        let analysis = classify("church in Enugu", false);
        assert_eq!(analysis.intent, SearchIntent::LocationSpecific);
        assert_eq!(analysis.clean_query, "church");
        assert_eq!(analysis.location.as_deref(), Some("enugu"));
        assert!((analysis.confidence - 0.8).abs() < 1e-9);
    }

    #[test]
    fn trailing_place_is_extracted() {
        let analysis = classify("nollywood fans port harcourt", false);
        assert_eq!(analysis.intent, SearchIntent::LocationSpecific);
        assert_eq!(analysis.location.as_deref(), Some("port harcourt"));
        assert_eq!(analysis.clean_query, "nollywood fans");
    }

    #[test]
    fn descriptor_place_is_extracted() {
        let analysis = classify("professionals lagos based", false);
        assert_eq!(analysis.intent, SearchIntent::LocationSpecific);
        assert_eq!(analysis.location.as_deref(), Some("lagos"));
        assert_eq!(analysis.clean_query, "professionals");
    }

    #[test]
    fn bare_place_name_is_location_specific() {
        let analysis = classify("london", false);
        assert_eq!(analysis.intent, SearchIntent::LocationSpecific);
        assert_eq!(analysis.location.as_deref(), Some("london"));
        assert_eq!(analysis.clean_query, "");
    }

    #[test]
    fn unknown_text_falls_back_to_general() {
        let analysis = classify("jollof cooking lessons", true);
        assert_eq!(analysis.intent, SearchIntent::GeneralText);
        assert_eq!(analysis.clean_query, "jollof cooking lessons");
    }
}
