//! 用户位置解析：显式坐标优先，其次按客户端IP做粗略定位。

use std::net::IpAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// 一次搜索请求解析出的用户位置
#[derive(Debug, Clone, Serialize)]
pub struct UserLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub city: Option<String>,
    pub country: Option<String>,
    /// "explicit" 或 "ip"
    pub source: &'static str,
}

/// ip-api.com风格的响应体
#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: String,
    city: Option<String>,
    country: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
}

/// IP地理定位客户端
pub struct IpGeoClient {
    http: reqwest::Client,
    endpoint: String,
}

impl IpGeoClient {
    pub fn new(endpoint: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }

    /// 根据IP查询大致位置。内网IP、查询失败、无效响应都返回None
    pub async fn lookup(&self, ip: IpAddr) -> Option<UserLocation> {
        if !is_public_ip(&ip) {
            return None;
        }

        let url = format!("{}/{}", self.endpoint, ip);
        let response = match self.http.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!("IP geolocation request failed: {}", e);
                return None;
            }
        };

        let body: IpApiResponse = match response.json().await {
            Ok(b) => b,
            Err(e) => {
                tracing::debug!("IP geolocation response malformed: {}", e);
                return None;
            }
        };

        if body.status != "success" {
            return None;
        }
        let latitude = body.lat?;
        let longitude = body.lon?;

        Some(UserLocation {
            latitude,
            longitude,
            city: body.city,
            country: body.country,
            source: "ip",
        })
    }
}

/// 判断是否是可用于地理定位的公网IP
pub fn is_public_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            !(v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast())
        }
        IpAddr::V6(v6) => {
            let seg0 = v6.segments()[0];
            // fc00::/7 和 fe80::/10
            !(v6.is_loopback() || v6.is_unspecified() || (seg0 & 0xfe00) == 0xfc00 || (seg0 & 0xffc0) == 0xfe80)
        }
    }
}

/// 解析用户位置：显式坐标 > IP推断 > 无。
/// 返回None表示没有任何位置上下文，调用方应使用非地理策略。
pub async fn resolve_user_location(
    lat: Option<f64>,
    lng: Option<f64>,
    client_ip: Option<IpAddr>,
    geo: &IpGeoClient,
) -> Option<UserLocation> {
    if let (Some(latitude), Some(longitude)) = (lat, lng) {
        return Some(UserLocation {
            latitude,
            longitude,
            city: None,
            country: None,
            source: "explicit",
        });
    }

    let ip = client_ip?;
    geo.lookup(ip).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_and_loopback_ips_are_not_public() {
        for ip in ["127.0.0.1", "10.1.2.3", "192.168.0.5", "169.254.1.1", "0.0.0.0", "::1", "fc00::1", "fe80::1"] {
            let ip: IpAddr = ip.parse().unwrap();
            assert!(!is_public_ip(&ip), "{} should not be public", ip);
        }
        let public: IpAddr = "203.0.113.9".parse().unwrap();
        assert!(is_public_ip(&public));
    }

    #[tokio::test]
    async fn explicit_coordinates_win_without_lookup() {
        // endpoint指向不存在的地址，显式坐标路径不应发起请求
        let geo = IpGeoClient::new("http://127.0.0.1:1/json");
        let loc = resolve_user_location(Some(6.52), Some(3.38), Some("203.0.113.9".parse().unwrap()), &geo)
            .await
            .expect("explicit coordinates should resolve");
        assert_eq!(loc.source, "explicit");
        assert!((loc.latitude - 6.52).abs() < 1e-9);
    }

    #[tokio::test]
    async fn private_ip_resolves_to_none_without_lookup() {
        let geo = IpGeoClient::new("http://127.0.0.1:1/json");
        let loc = resolve_user_location(None, None, Some("192.168.1.10".parse().unwrap()), &geo).await;
        assert!(loc.is_none());
    }

    #[tokio::test]
    async fn missing_everything_resolves_to_none() {
        let geo = IpGeoClient::new("http://127.0.0.1:1/json");
        assert!(resolve_user_location(None, None, None, &geo).await.is_none());
    }
}
