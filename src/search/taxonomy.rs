//! 搜索用的固定词表：机构名称后缀和分类关键词。
//! 手工维护的常量数据，修改词表不需要动分类逻辑。

pub const TAXONOMY_VERSION: u32 = 1;

/// 机构名称后缀。专有名词以这些词结尾时按精确名称查询处理
pub const EXACT_NAME_SUFFIXES: &[&str] = &[
    "gym",
    "church",
    "mosque",
    "university",
    "college",
    "school",
    "club",
    "association",
    "foundation",
    "organization",
    "ltd",
    "limited",
    "inc",
    "incorporated",
    "ngo",
    "group",
    "society",
    "community",
    "center",
    "centre",
];

/// 分类关键词（宗教、教育、体育健身、专业商务、社交文化、公益互助）
pub const CATEGORY_KEYWORDS: &[&str] = &[
    // 宗教
    "church",
    "mosque",
    "religious",
    "christian",
    "muslim",
    "faith",
    "worship",
    "cathedral",
    "chapel",
    "synagogue",
    "temple",
    // 教育
    "school",
    "university",
    "college",
    "alumni",
    "student",
    "education",
    "academic",
    "learning",
    "study",
    "campus",
    // 体育健身
    "gym",
    "fitness",
    "sports",
    "tennis",
    "football",
    "basketball",
    "swimming",
    "boxing",
    "martial arts",
    "yoga",
    "aerobics",
    "recreation",
    "athletic",
    // 专业商务
    "business",
    "professional",
    "entrepreneur",
    "network",
    "trade",
    "industry",
    "corporate",
    "association",
    "chamber",
    // 社交文化
    "club",
    "group",
    "community",
    "social",
    "cultural",
    "society",
    "gathering",
    "meetup",
    "organization",
    // 公益互助
    "support",
    "help",
    "charity",
    "volunteer",
    "nonprofit",
    "foundation",
    "welfare",
    "humanitarian",
];

/// 关键词的近义词，用于提高分类命中率
pub fn related_terms(keyword: &str) -> &'static [&'static str] {
    match keyword {
        "church" => &["parish", "congregation", "ministry"],
        "gym" => &["fitness", "workout", "exercise"],
        "school" => &["academy", "institute", "college"],
        "business" => &["enterprise", "company", "corporation"],
        "club" => &["society", "group", "association"],
        "sports" => &["athletics", "games", "recreation"],
        _ => &[],
    }
}

/// 查询是否包含分类关键词（含复数形式和近义词）
pub fn is_category_query(query: &str) -> bool {
    let q = query.to_lowercase();
    CATEGORY_KEYWORDS.iter().any(|kw| {
        q.contains(kw)
            || q.contains(&format!("{}s", kw))
            || related_terms(kw).iter().any(|term| q.contains(term))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_category_keywords() {
        assert!(is_category_query("tennis club"));
        assert!(is_category_query("church"));
        assert!(is_category_query("best gyms"));
        assert!(!is_category_query("amala joint"));
    }

    #[test]
    fn recognizes_related_terms() {
        // "parish" 是 "church" 的近义词
        assert!(is_category_query("catholic parish"));
        assert!(is_category_query("workout partners"));
    }
}
