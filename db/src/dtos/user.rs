#[derive(Debug, Clone, PartialEq)]
pub struct UserCreateRequest {
    pub user_id: i64,
    pub username: Option<String>,
    pub name: Option<String>,
    pub referrer_id: Option<i64>,
}
