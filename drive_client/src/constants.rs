use std::time::Duration;

utils::configurable_constants! {
    /// Base URL that drive resources (e.g. `/me/drive/items/{id}/content`) are appended to.
    ref GRAPH_ENDPOINT: String = "https://graph.microsoft.com/v1.0".to_string();

    /// Maximum time allowed to establish a TCP connection to the server.
    ref CONNECT_TIMEOUT: Duration = Duration::from_secs(60);

    /// A token that expires within this margin is refreshed before it is used.
    ref TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(5 * 60);
}
