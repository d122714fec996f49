//! 静态地名表：城市名到坐标和默认搜索半径的映射。
//! 手工维护的常量数据，进程启动后只读，扩充数据时递增版本号。

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

pub const GAZETTEER_VERSION: u32 = 1;

/// 地名表条目
#[derive(Debug, Clone, Copy)]
pub struct PlaceEntry {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
    /// 城市级别的默认搜索半径，单位公里
    pub radius_km: f64,
}

const fn place(name: &'static str, lat: f64, lng: f64, radius_km: f64) -> PlaceEntry {
    PlaceEntry {
        name,
        lat,
        lng,
        radius_km,
    }
}

/// 带坐标的城市表（尼日利亚城市 + 海外侨居城市）
static PLACE_COORDINATES: &[PlaceEntry] = &[
    // 尼日利亚城市
    place("lagos", 6.5244, 3.3792, 25.0),
    place("abuja", 9.0765, 7.3986, 20.0),
    place("kano", 12.0022, 8.5920, 15.0),
    place("ibadan", 7.3775, 3.9470, 15.0),
    place("port harcourt", 4.8156, 7.0498, 15.0),
    place("benin city", 6.3350, 5.6037, 12.0),
    place("benin", 6.3350, 5.6037, 12.0),
    place("jos", 9.8965, 8.8583, 12.0),
    place("ilorin", 8.4966, 4.5426, 12.0),
    place("enugu", 6.5244, 7.5086, 12.0),
    place("aba", 5.1066, 7.3667, 10.0),
    place("onitsha", 6.1667, 6.7833, 10.0),
    place("warri", 5.5167, 5.7500, 10.0),
    place("calabar", 4.9517, 8.3220, 10.0),
    place("akure", 7.2571, 5.2058, 10.0),
    place("abeokuta", 7.1475, 3.3619, 10.0),
    place("owerri", 5.4840, 7.0351, 10.0),
    place("awka", 6.2104, 7.0714, 10.0),
    place("asaba", 6.1987, 6.7405, 10.0),
    place("uyo", 5.0380, 7.9070, 10.0),
    place("makurdi", 7.7327, 8.5114, 10.0),
    // 海外城市
    place("london", 51.5074, -0.1278, 50.0),
    place("manchester", 53.4808, -2.2426, 25.0),
    place("birmingham", 52.4862, -1.8904, 25.0),
    place("new york", 40.7128, -74.0060, 50.0),
    place("houston", 29.7604, -95.3698, 30.0),
    place("atlanta", 33.7490, -84.3880, 30.0),
    place("chicago", 41.8781, -87.6298, 30.0),
    place("toronto", 43.6532, -79.3832, 30.0),
    place("vancouver", 49.2827, -123.1207, 25.0),
];

/// 意图分类使用的已知地名（城市、州，以及上面的坐标表）。
/// 州暂时没有坐标，命中后会退回文本过滤。
static KNOWN_PLACES: &[&str] = &[
    // 主要城市
    "lagos",
    "abuja",
    "kano",
    "ibadan",
    "benin city",
    "port harcourt",
    "jos",
    "ilorin",
    "aba",
    "onitsha",
    "enugu",
    "abeokuta",
    "owerri",
    "warri",
    "calabar",
    "akure",
    "awka",
    "asaba",
    "uyo",
    "makurdi",
    "minna",
    "bauchi",
    "gombe",
    "yola",
    "sokoto",
    "katsina",
    "kaduna",
    "zaria",
    "lokoja",
    "lafia",
    "nnewi",
    "umuahia",
    "abakaliki",
    "orlu",
    "nsukka",
    // 州
    "anambra",
    "imo",
    "abia",
    "ebonyi",
    "cross river",
    "akwa ibom",
    "rivers",
    "bayelsa",
    "delta",
    "edo",
    "ondo",
    "ekiti",
    "osun",
    "oyo",
    "ogun",
    "kwara",
    "niger",
    "kogi",
    "benue",
    "plateau",
    "nasarawa",
    "taraba",
    "adamawa",
    "borno",
    "yobe",
    "jigawa",
    "kebbi",
    "zamfara",
    // 海外侨居城市
    "london",
    "manchester",
    "birmingham",
    "new york",
    "houston",
    "atlanta",
    "chicago",
    "toronto",
    "vancouver",
    "johannesburg",
    "cape town",
    "dubai",
    "frankfurt",
];

fn coordinate_index() -> &'static HashMap<&'static str, &'static PlaceEntry> {
    static INDEX: OnceLock<HashMap<&'static str, &'static PlaceEntry>> = OnceLock::new();
    INDEX.get_or_init(|| PLACE_COORDINATES.iter().map(|e| (e.name, e)).collect())
}

fn known_place_set() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| {
        let mut set: HashSet<&'static str> = KNOWN_PLACES.iter().copied().collect();
        set.extend(PLACE_COORDINATES.iter().map(|e| e.name));
        set
    })
}

/// 按地名查坐标。大小写不敏感的精确匹配，不做模糊匹配；
/// 未知地名返回None，调用方需退回文本搜索。
pub fn lookup_place(name: &str) -> Option<&'static PlaceEntry> {
    coordinate_index()
        .get(name.trim().to_lowercase().as_str())
        .copied()
}

/// 判断一个词是否是已知地名（供意图分类使用）
pub fn is_known_place(token: &str) -> bool {
    known_place_set().contains(token.trim().to_lowercase().as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive_exact() {
        let lagos = lookup_place("Lagos").expect("lagos should be in the gazetteer");
        assert!((lagos.lat - 6.5244).abs() < 1e-6);
        assert!((lagos.lng - 3.3792).abs() < 1e-6);

        assert!(lookup_place(" Port Harcourt ").is_some());
        // 不做模糊匹配
        assert!(lookup_place("lagoss").is_none());
        assert!(lookup_place("lag").is_none());
    }

    #[test]
    fn states_are_known_but_have_no_coordinates() {
        assert!(is_known_place("anambra"));
        assert!(lookup_place("anambra").is_none());
    }

    #[test]
    fn diaspora_hubs_are_known() {
        assert!(is_known_place("London"));
        assert!(is_known_place("new york"));
        assert!(!is_known_place("paris"));
    }
}
