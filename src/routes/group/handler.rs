use axum::{
    extract::{Json, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::AppState;
use crate::database::models::group::NewGroup;
use crate::database::{GroupFilter, GroupStore};
use crate::search::engine::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::utils::{error_codes, error_to_api_response, success_to_api_response};

use super::model::{CategoryListResponse, ClickRequest, GroupListResponse, ListQuery, SlugQuery};

/// 首页精选群组的展示上限
const FEATURED_LIMIT: i64 = 6;

#[axum::debug_handler]
pub async fn list_groups(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> impl IntoResponse {
    let page = query
        .page
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(1)
        .max(1);
    let limit = query
        .limit
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    let filter = GroupFilter {
        category: query.category.filter(|c| !c.trim().is_empty()),
        location: query.location.filter(|l| !l.trim().is_empty()),
        ..GroupFilter::default()
    };

    match state.repo.find_approved(&filter).await {
        Ok(groups) => {
            let total = groups.len();
            let offset = page.saturating_sub(1).saturating_mul(limit);
            let groups = groups.into_iter().skip(offset).take(limit).collect();
            (
                StatusCode::OK,
                success_to_api_response(GroupListResponse {
                    groups,
                    total,
                    page,
                    limit,
                }),
            )
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            error_to_api_response(error_codes::INTERNAL_ERROR, e.to_string()),
        ),
    }
}

#[axum::debug_handler]
pub async fn featured_groups(State(state): State<AppState>) -> impl IntoResponse {
    match state.repo.find_featured(FEATURED_LIMIT).await {
        Ok(groups) => (StatusCode::OK, success_to_api_response(groups)),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            error_to_api_response(error_codes::INTERNAL_ERROR, e.to_string()),
        ),
    }
}

#[axum::debug_handler]
pub async fn group_categories(State(state): State<AppState>) -> impl IntoResponse {
    match state.repo.distinct_categories().await {
        Ok(categories) => (
            StatusCode::OK,
            success_to_api_response(CategoryListResponse { categories }),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            error_to_api_response(error_codes::INTERNAL_ERROR, e.to_string()),
        ),
    }
}

#[axum::debug_handler]
pub async fn get_by_slug(
    State(state): State<AppState>,
    Query(query): Query<SlugQuery>,
) -> impl IntoResponse {
    match state.repo.find_by_slug(&query.slug).await {
        Ok(Some(group)) => {
            state.repo.record_view(&query.slug).await;
            (StatusCode::OK, success_to_api_response(group))
        }
        Ok(None) => (
            StatusCode::NOT_FOUND,
            error_to_api_response(error_codes::NOT_FOUND, "Group not found".to_string()),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            error_to_api_response(error_codes::INTERNAL_ERROR, e.to_string()),
        ),
    }
}

/// 提交校验，返回所有问题而不是第一个
fn validate_submission(submission: &NewGroup) -> Vec<String> {
    let mut problems = Vec::new();
    if submission.name.trim().chars().count() < 2 {
        problems.push("name must be at least 2 characters".to_string());
    }
    if submission.description.trim().chars().count() < 10 {
        problems.push("description must be at least 10 characters".to_string());
    }
    let has_city = submission.city.as_deref().is_some_and(|c| !c.trim().is_empty());
    let has_country = submission
        .country
        .as_deref()
        .is_some_and(|c| !c.trim().is_empty());
    if !has_city && !has_country {
        problems.push("either city or country is required".to_string());
    }
    if let Some(email) = submission.email.as_deref() {
        if !email.trim().is_empty() && (!email.contains('@') || !email.contains('.')) {
            problems.push("email is not valid".to_string());
        }
    }
    if let Some(website) = submission.website.as_deref() {
        if !website.trim().is_empty()
            && !website.starts_with("http://")
            && !website.starts_with("https://")
        {
            problems.push("website must start with http:// or https://".to_string());
        }
    }
    problems
}

#[axum::debug_handler]
pub async fn submit_group(
    State(state): State<AppState>,
    Json(submission): Json<NewGroup>,
) -> impl IntoResponse {
    let problems = validate_submission(&submission);
    if !problems.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            error_to_api_response(error_codes::VALIDATION_ERROR, problems.join("; ")),
        );
    }

    match state.repo.create_group(&submission).await {
        Ok(group) => (StatusCode::CREATED, success_to_api_response(group)),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            error_to_api_response(error_codes::INTERNAL_ERROR, e.to_string()),
        ),
    }
}

#[axum::debug_handler]
pub async fn record_click(
    State(state): State<AppState>,
    Json(req): Json<ClickRequest>,
) -> impl IntoResponse {
    tracing::debug!(
        slug = req.slug,
        click_type = req.click_type.as_deref().unwrap_or("unknown"),
        target = req.target_url.as_deref().unwrap_or(""),
        "outbound click"
    );
    state.repo.record_click(&req.slug).await;
    success_to_api_response(serde_json::json!({ "recorded": true }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission() -> NewGroup {
        NewGroup {
            name: "Igbo Union".into(),
            description: "A cultural association for the diaspora".into(),
            address: None,
            city: Some("Lagos".into()),
            region: None,
            country: None,
            phone: None,
            email: None,
            website: None,
            whatsapp: None,
            social_links: vec![],
            categories: vec![],
            tags: vec![],
            lat: None,
            lng: None,
        }
    }

    #[test]
    fn valid_submission_passes() {
        assert!(validate_submission(&submission()).is_empty());
    }

    #[test]
    fn all_problems_are_collected() {
        let mut bad = submission();
        bad.name = "x".into();
        bad.description = "too short".into();
        bad.city = None;
        let problems = validate_submission(&bad);
        assert_eq!(problems.len(), 3);
    }

    #[test]
    fn optional_contacts_are_checked_when_present() {
        let mut sub = submission();
        sub.email = Some("not-an-email".into());
        sub.website = Some("example.com".into());
        let problems = validate_submission(&sub);
        assert_eq!(problems.len(), 2);

        sub.email = Some("someone@example.com".into());
        sub.website = Some("https://example.com".into());
        assert!(validate_submission(&sub).is_empty());
    }
}
