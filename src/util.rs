use chrono::{DateTime, Local};
use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::{listing::ListingEntry, param::STATUS_CODES};

pub struct HtmlBuilder {
    title: String,
    css: String,
    body: String,
}

impl HtmlBuilder {
    /// 错误页面：只包含状态码与原因短语，不暴露任何内部路径或调用栈。
    pub fn from_status_code(code: u16) -> Self {
        let title = format!("{}", code);
        let css = r"
            body {
                width: 35em;
                margin: 0 auto;
                font-family: Tahoma, Verdana, Arial, sans-serif;
            }
            "
        .to_string();
        let reason = STATUS_CODES.get(&code).copied().unwrap_or("Unknown Status");
        let body = format!(
            r"
            <h1>{}</h1>
            <p>Failure: {} {}</p>
            ",
            code,
            code,
            encode_text(reason)
        );
        Self { title, css, body }
    }

    /// 目录列表页面。
    ///
    /// `title` 是展示给用户的目录路径，`request_path` 是客户端请求的原始路径，
    /// 每个条目的链接为 `request_path`（去掉末尾 `/`）+ `/` + 文件名。所有插入的文本都会转义。
    pub fn from_listing(title: &str, request_path: &str, entries: &[ListingEntry]) -> Self {
        let base = request_path.trim_end_matches('/');
        let mut body = String::new();

        body.push_str(&format!("<h1>{} 目录：</h1><hr>", encode_text(title)));
        body.push_str("<table>");
        body.push_str(
            r#"
            <tr>
                <td>文件名</td>
                <td>大小</td>
                <td>修改时间</td>
            </tr>
            <tr>
                <td><a href="../">..</a></td>
                <td></td>
                <td></td>
            </tr>
            "#,
        );
        for entry in entries {
            let name = if entry.is_dir() {
                format!("{}/", entry.name())
            } else {
                entry.name().to_string()
            };
            let href = format!("{}/{}", base, name);
            let size = if entry.is_dir() {
                "文件夹".to_string()
            } else {
                format_file_size(entry.size())
            };
            let modified = entry
                .modified()
                .map(|time| {
                    let local_time: DateTime<Local> = time.into();
                    local_time.format("%Y-%m-%d %H:%M:%S").to_string()
                })
                .unwrap_or_default();
            body.push_str(&format!(
                r#"
                <tr>
                    <td><a href="{}">{}</a></td>
                    <td>{}</td>
                    <td>{}</td>
                </tr>
                "#,
                encode_double_quoted_attribute(&href),
                encode_text(&name),
                size,
                modified
            ));
        }
        body.push_str("</table>");

        let title = format!("{} 目录", title);
        let css = r"
            table {
                border-collapse: collapse;
                width: 100%;
            }

            td {
                padding: 8px;
                white-space: pre-wrap;
                border: none;
            }"
        .to_string();
        HtmlBuilder { title, css, body }
    }

    pub fn build(&self) -> String {
        format!(
            r##"<!DOCTYPE html>
<html>
    <head>
        <meta charset="utf-8">
        <title>{}</title>
        <style>{}</style>
    </head>
    <body>
    {}
    </body>
</html>
"##,
            encode_text(&self.title),
            self.css,
            self.body
        )
    }
}

pub fn format_file_size(size: u64) -> String {
    let units = ["B", "KB", "MB", "GB", "TB"];
    let mut size = size as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < units.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.1} {}", size, units[unit_index])
}
