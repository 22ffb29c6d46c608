use ammonia;

/// Clean HTML content using the ammonia library.
///
/// Applied to free-text round answers before they are cached or
/// submitted, so recruiter dashboards never render candidate-supplied markup.
/// Safe tags (like <b>, <p>) survive; <script>, <iframe> and event-handler
/// attributes are stripped.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
