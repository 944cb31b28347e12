use url::Url;

/// Appends `path` to the path of `base`, keeping any base path prefix.
pub(crate) fn join_endpoint(base: &Url, path: &str) -> Url {
    let mut url = base.clone();
    let joined = format!(
        "{}/{}",
        base.path().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    url.set_path(&joined);
    url.set_query(None);
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_base_path_prefix() {
        let base = Url::parse("https://app.perfectpay.com.br/api/v1").unwrap();
        assert_eq!(
            join_endpoint(&base, "/sales/get").as_str(),
            "https://app.perfectpay.com.br/api/v1/sales/get"
        );

        let root = Url::parse("https://graph.facebook.com/").unwrap();
        assert_eq!(
            join_endpoint(&root, "v18.0/act_1/insights").as_str(),
            "https://graph.facebook.com/v18.0/act_1/insights"
        );
    }
}
