// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 协议参数与常量模块
//!
//! 该模块定义了 `tinyserver` 遵循的 HTTP 协议相关常量和数据结构，包括：
//! - 响应中使用的状态码及其原因短语（Reason Phrase）。
//! - 文件后缀名到 MIME 类型的映射表。
//! - HTTP 方法的强类型枚举。

use std::collections::HashMap;
use std::fmt;

use lazy_static::lazy_static;

/// 服务器名称标识，用于 HTTP 响应头的 `Server` 字段
pub const SERVER_NAME: &str = "tinyserver";

/// HTTP 协议规定的换行符（Carriage Return Line Feed）
pub const CRLF: &str = "\r\n";

/// 固定的 `Cache-Control` 响应头取值
pub const CACHE_CONTROL: &str = "private, max-age=0";

/// 每个连接只处理一个请求，响应后即关闭
pub const CONNECTION: &str = "close";

/// 响应正文使用的字符集
pub const CHARSET: &str = "utf-8";

/// 无法识别后缀名时使用的兜底 MIME 类型
pub const DEFAULT_MIME: &str = "application/octet-stream";

lazy_static! {
    /// 文件后缀名到 MIME 类型（Media Type）的映射表。
    ///
    /// 字符集由响应头统一追加，这里只保存纯粹的类型。
    pub static ref MIME_TYPES: HashMap<&'static str, &'static str> = {
        let mut map = HashMap::new();
        map.insert("aac", "audio/aac");
        map.insert("avi", "video/x-msvideo");
        map.insert("bin", "application/octet-stream");
        map.insert("binary", "application/octet-stream");
        map.insert("bmp", "image/bmp");
        map.insert("css", "text/css");
        map.insert("csv", "text/csv");
        map.insert("doc", "application/msword");
        map.insert("flv", "video/x-flv");
        map.insert("gif", "image/gif");
        map.insert("gz", "application/gzip");
        map.insert("htm", "text/html");
        map.insert("html", "text/html");
        map.insert("ico", "image/x-icon");
        map.insert("jpg", "image/jpeg");
        map.insert("jpeg", "image/jpeg");
        map.insert("js", "application/javascript");
        map.insert("json", "application/json");
        map.insert("mov", "video/quicktime");
        map.insert("mp3", "audio/mpeg");
        map.insert("mp4", "video/mp4");
        map.insert("pdf", "application/pdf");
        map.insert("png", "image/png");
        map.insert("svg", "image/svg+xml");
        map.insert("swf", "application/x-shockwave-flash");
        map.insert("tar", "application/x-tar");
        map.insert("txt", "text/plain");
        map.insert("wasm", "application/wasm");
        map.insert("webp", "image/webp");
        map.insert("woff", "font/woff");
        map.insert("woff2", "font/woff2");
        map.insert("xml", "text/xml");
        map.insert("zip", "application/octet-stream");
        map
    };
}

/// 服务器支持的 HTTP 请求方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpRequestMethod {
    /// 获取资源，参数通过查询字符串传递
    Get,
    /// 提交数据，正文长度由 `Content-Length` 给出
    Post,
}

impl HttpRequestMethod {
    /// 从请求行中的方法名解析，区分大小写。
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            _ => None,
        }
    }
}

impl fmt::Display for HttpRequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            HttpRequestMethod::Get => write!(f, "GET"),
            HttpRequestMethod::Post => write!(f, "POST"),
        }
    }
}

/// 响应可能携带的状态码
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Success,
    Forbidden,
    NotFound,
    Error,
}

impl StatusCode {
    pub fn code(&self) -> u16 {
        match self {
            StatusCode::Success => 200,
            StatusCode::Forbidden => 403,
            StatusCode::NotFound => 404,
            StatusCode::Error => 500,
        }
    }

    /// 标准原因短语，参考 RFC 9110
    pub fn reason(&self) -> &'static str {
        match self {
            StatusCode::Success => "OK",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotFound => "Not Found",
            StatusCode::Error => "Internal Server Error",
        }
    }

    /// 面向用户的默认说明文字，在调用方未提供消息时使用
    pub fn description(&self) -> &'static str {
        match self {
            StatusCode::Success => "Success",
            StatusCode::Forbidden => "You don't have enough rights to access this resource.",
            StatusCode::NotFound => "The requested resource wasn't found.",
            StatusCode::Error => "An error occured.",
        }
    }

    /// 状态行中跟在协议版本之后的部分，例如 `404 Not Found`
    pub fn status_line(&self) -> String {
        format!("{} {}", self.code(), self.reason())
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.status_line())
    }
}

/// 根据文件路径的后缀名确定 MIME 类型。
///
/// 后缀名取最后一个 `.` 之后的部分；路径中没有 `.`，或 `.` 位于开头时视为无后缀。
pub fn mime_from_path(path: &str) -> &'static str {
    let extension = match path.rfind('.') {
        Some(dot) if dot > 0 => &path[dot + 1..],
        _ => "binary",
    };
    match MIME_TYPES.get(extension) {
        Some(v) => v,
        None => DEFAULT_MIME,
    }
}
