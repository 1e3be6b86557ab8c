use crate::param::StatusCode;

/// 固定结构的 HTML 页面：标题、二级标题与一段说明。
///
/// HTML 格式的状态响应（403/404/500）都通过它生成正文。
pub struct HtmlBuilder {
    title: String,
    heading: String,
    detail: String,
}

impl HtmlBuilder {
    pub fn new(title: &str, heading: &str, detail: &str) -> Self {
        Self {
            title: title.to_string(),
            heading: heading.to_string(),
            detail: detail.to_string(),
        }
    }

    // 原因短语同时作为标题和二级标题
    pub fn from_status_code(code: StatusCode, note: Option<&str>) -> Self {
        let detail = match note {
            Some(n) => n,
            None => code.description(),
        };
        Self::new(code.reason(), code.reason(), detail)
    }

    pub fn build(&self) -> String {
        format!(
            "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{}</title></head>\
             <body><h2>{}</h2><br><h3>{}</h3></body></html>",
            self.title, self.heading, self.detail
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_builder_from_status_code() {
        let html = HtmlBuilder::from_status_code(StatusCode::NotFound, Some("测试404")).build();
        assert!(html.contains("<title>Not Found</title>"));
        assert!(html.contains("<h2>Not Found</h2>"));
        assert!(html.contains("<h3>测试404</h3>"));
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.ends_with("</html>"));
    }

    #[test]
    fn test_html_builder_from_status_code_no_note() {
        let html = HtmlBuilder::from_status_code(StatusCode::Forbidden, None).build();
        assert!(html.contains(StatusCode::Forbidden.description()));
    }

    #[test]
    fn test_html_builder_structure() {
        let html = HtmlBuilder::new("t", "h", "d").build();

        assert!(html.contains("<html>"));
        assert!(html.contains("</html>"));
        assert!(html.contains("<head>"));
        assert!(html.contains("</head>"));
        assert!(html.contains("<body>"));
        assert!(html.contains("</body>"));
        assert!(html.contains("<title>t</title>"));
        assert!(html.contains("charset=\"utf-8\""));
    }
}
