// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 请求上下文模块
//!
//! `RequestContext` 是处理器能看到的全部请求状态：具名参数、通配符参数、POST 正文，
//! 以及为本次请求绑定的响应格式化器。它由连接独占，连接关闭时随之销毁。

use crate::{
    param::HttpRequestMethod,
    response::{Payload, ResponseFormatter},
};

use log::warn;

use std::collections::HashMap;

/// 路由处理器。
///
/// 所有 `Fn(&mut RequestContext) + Send + Sync` 闭包都自动实现该 trait。
pub trait Handler: Send + Sync {
    fn handle(&self, ctx: &mut RequestContext);
}

impl<F> Handler for F
where
    F: Fn(&mut RequestContext) + Send + Sync,
{
    fn handle(&self, ctx: &mut RequestContext) {
        self(ctx)
    }
}

#[derive(Debug)]
pub struct RequestContext {
    id: u128,
    method: HttpRequestMethod,
    raw_path: String,
    named_params: HashMap<String, String>,
    wildcard_params: Vec<String>,
    body: Option<String>,
    formatter: ResponseFormatter,
}

impl RequestContext {
    pub fn new(
        id: u128,
        method: HttpRequestMethod,
        raw_path: &str,
        body: Option<String>,
        formatter: ResponseFormatter,
    ) -> Self {
        Self {
            id,
            method,
            raw_path: raw_path.to_string(),
            named_params: HashMap::new(),
            wildcard_params: Vec::new(),
            body,
            formatter,
        }
    }

    /// 按名称获取查询参数或路径参数，空名称总是返回 `None`
    pub fn param(&self, name: &str) -> Option<&str> {
        if name.is_empty() {
            return None;
        }
        self.named_params.get(name).map(String::as_str)
    }

    /// 通配符 `*` 捕获到的值，按模板中出现的顺序排列
    pub fn wildcard_params(&self) -> &[String] {
        &self.wildcard_params
    }

    /// POST 正文，GET 请求没有正文
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// `formatter().success(data)` 的简写
    pub fn write(&mut self, data: impl Into<Payload>) {
        self.formatter.success(data);
    }

    /// `formatter().success_json(data)` 的简写
    pub fn write_json<T: serde::Serialize>(&mut self, data: &T) {
        self.formatter.success_json(data);
    }

    /// 直接访问格式化器，用于 `forbidden`、`not_found`、`error` 等响应
    pub fn formatter(&mut self) -> &mut ResponseFormatter {
        &mut self.formatter
    }

    pub fn method(&self) -> HttpRequestMethod {
        self.method
    }

    /// 请求行中的原始路径（含查询字符串）
    pub fn path(&self) -> &str {
        &self.raw_path
    }

    pub fn id(&self) -> u128 {
        self.id
    }

    /// 插入具名参数。已存在的键不会被覆盖，重复或空的键只记录警告并丢弃。
    pub(crate) fn insert_param(&mut self, key: String, value: String) -> bool {
        if key.is_empty() {
            warn!("[ID{}]参数名为空，已丢弃", self.id);
            return false;
        }
        if self.named_params.contains_key(&key) {
            warn!("[ID{}]参数{}已存在，重复的值已丢弃", self.id, key);
            return false;
        }
        self.named_params.insert(key, value);
        true
    }

    pub(crate) fn push_wildcard(&mut self, value: String) {
        self.wildcard_params.push(value);
    }

    pub(crate) fn into_formatter(self) -> ResponseFormatter {
        self.formatter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::ResponseFormat;

    fn context(body: Option<&str>) -> RequestContext {
        RequestContext::new(
            7,
            HttpRequestMethod::Get,
            "/a?b=c",
            body.map(str::to_string),
            ResponseFormatter::new(ResponseFormat::Plain, 7),
        )
    }

    #[test]
    fn test_first_param_wins() {
        let mut ctx = context(None);
        assert!(ctx.insert_param("a".to_string(), "1".to_string()));
        assert!(!ctx.insert_param("a".to_string(), "2".to_string()));
        assert_eq!(ctx.param("a"), Some("1"));
    }

    #[test]
    fn test_empty_param_name_rejected() {
        let mut ctx = context(None);
        assert!(!ctx.insert_param(String::new(), "x".to_string()));
        assert_eq!(ctx.param(""), None);
    }

    #[test]
    fn test_wildcards_keep_order() {
        let mut ctx = context(None);
        ctx.push_wildcard("x".to_string());
        ctx.push_wildcard("y".to_string());
        assert_eq!(ctx.wildcard_params(), &["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn test_accessors() {
        let ctx = context(Some("hello world"));
        assert_eq!(ctx.body(), Some("hello world"));
        assert_eq!(ctx.path(), "/a?b=c");
        assert_eq!(ctx.method(), HttpRequestMethod::Get);
        assert_eq!(ctx.id(), 7);
        assert_eq!(ctx.param("missing"), None);
    }

    #[test]
    fn test_write_delegates_to_formatter() {
        let mut ctx = context(None);
        ctx.write("ok");
        assert!(ctx.formatter().header_sent());
        ctx.formatter().not_found(None);
        assert!(ctx.into_formatter().sink().len() > 0);
    }

    #[test]
    fn test_closure_is_handler() {
        let handler = |ctx: &mut RequestContext| ctx.write("from closure");
        let mut ctx = context(None);
        handler.handle(&mut ctx);
        assert!(ctx.formatter().header_sent());
    }
}
