// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Exception 模块
//!
//! 该模块定义了服务器在连接处理、路由注册与监听过程中可能出现的异常情况。
//!
//! ## 设计意图
//! - **错误分类**：协议解析错误、传输层错误以及路由模板错误各自对应独立的变体。
//! - **作用域**：除 `BindFailed` 外，所有异常都只影响单个连接，不会使监听循环退出。
//! - **可读性**：通过实现 `std::fmt::Display`，错误信息可以直接写入日志。

use std::{fmt, io};

/// 服务器处理过程中发生的异常类型。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exception {
    /// 客户端在发送请求行之前就关闭了连接，或发送了空行。
    EmptyRequest,
    /// 请求行无法拆分出方法与路径两个部分。
    MalformedRequestLine,
    /// 客户端使用了服务器不支持的 HTTP 方法（仅支持 GET 与 POST）。
    UnsupportedRequestMethod,
    /// `Content-Length` 标头的值不是合法的非负整数。
    InvalidContentLength,
    /// 路由模板无法编译为匹配器。
    InvalidRoute(String),
    /// 监听端口绑定失败。这是唯一会让 `listen` 返回的异常。
    BindFailed(u16),
    /// 读写 Socket 时发生的 I/O 错误。
    Io(io::ErrorKind),
}

use Exception::*;

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmptyRequest => write!(f, "Empty request"),
            MalformedRequestLine => write!(f, "Malformed request line"),
            UnsupportedRequestMethod => write!(f, "Unsupported request method"),
            InvalidContentLength => write!(f, "Invalid Content-Length header"),
            InvalidRoute(template) => write!(f, "Invalid route template: {}", template),
            BindFailed(port) => write!(f, "Port already in use: {}", port),
            Io(kind) => write!(f, "I/O error: {}", kind),
        }
    }
}

impl std::error::Error for Exception {}

impl From<io::Error> for Exception {
    fn from(e: io::Error) -> Self {
        Io(e.kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(EmptyRequest.to_string(), "Empty request");
        assert_eq!(BindFailed(8000).to_string(), "Port already in use: 8000");
        assert_eq!(
            InvalidRoute("/a/[b".to_string()).to_string(),
            "Invalid route template: /a/[b"
        );
    }

    #[test]
    fn test_from_io_error() {
        let e = io::Error::new(io::ErrorKind::UnexpectedEof, "eof");
        assert_eq!(Exception::from(e), Io(io::ErrorKind::UnexpectedEof));
    }
}
