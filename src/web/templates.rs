use askama::Template;

/// One id-token claim, rendered as a table row
#[derive(Debug, Clone)]
pub struct ClaimRow {
    pub name: String,
    pub value: String,
}

#[derive(Template)]
#[template(path = "auth/status.html")]
pub struct StatusTemplate {
    pub description: String,
    pub username: Option<String>,
}

#[derive(Template)]
#[template(path = "auth/token.html")]
pub struct TokenTemplate {
    pub username: Option<String>,
    pub claims: Vec<ClaimRow>,
}

#[derive(Template)]
#[template(path = "auth/get-secrets.html")]
pub struct SecretsTemplate {
    pub secret_name: String,
    pub secret_value: String,
    pub secret_id: Option<String>,
}

#[derive(Template)]
#[template(path = "auth/call-graph.html")]
pub struct GraphTemplate {
    pub endpoint: String,
    pub results: String,
}

#[derive(Template)]
#[template(path = "auth/401.html")]
pub struct UnauthenticatedTemplate {}
