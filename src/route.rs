// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 路由模板模块
//!
//! 将形如 `/customers/[id]/files/*` 的路由模板编译为锚定的正则表达式：
//! - `[name]` 是具名参数，匹配单个路径段 `[^/]+`；
//! - `*` 是通配符，贪婪匹配剩余部分 `.*`；
//! - 其余字符按字面匹配。
//!
//! 每个占位符对应一个捕获组，参数名按出现顺序保存，与捕获组一一对应。

use crate::{
    context::Handler,
    exception::Exception,
    response::ResponseFormat,
};

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

use std::{fmt, sync::Arc};

lazy_static! {
    static ref PLACEHOLDER: Regex = Regex::new(r"\[(.*?)\]|\*").unwrap();
}

/// 捕获组对应的参数名
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamName {
    /// `[name]` 占位符，按名称访问
    Named(String),
    /// `*` 占位符，按位置访问，携带它在捕获组中的序号
    Wildcard(usize),
}

impl ParamName {
    pub fn is_wildcard(&self) -> bool {
        matches!(self, ParamName::Wildcard(_))
    }
}

impl fmt::Display for ParamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamName::Named(name) => write!(f, "{}", name),
            ParamName::Wildcard(index) => write!(f, "*{}", index),
        }
    }
}

/// 编译后的路由模板及其绑定的处理器
pub struct RoutePattern {
    template: String,
    matcher: Regex,
    param_names: Vec<ParamName>,
    handler: Arc<dyn Handler>,
    format: Option<ResponseFormat>,
}

impl RoutePattern {
    /// 编译路由模板。
    ///
    /// 不以 `/` 开头的模板会在末尾追加 `/`，这是沿用下来的兼容行为。
    pub fn compile(
        template: &str,
        handler: Arc<dyn Handler>,
        format: Option<ResponseFormat>,
    ) -> Result<Self, Exception> {
        let mut template = template.to_string();
        if !template.starts_with('/') {
            template.push('/');
        }

        let mut pattern = String::from("^");
        let mut param_names = Vec::new();
        let mut last = 0;
        for capture in PLACEHOLDER.captures_iter(&template) {
            let whole = match capture.get(0) {
                Some(m) => m,
                None => continue,
            };
            pattern.push_str(&regex::escape(&template[last..whole.start()]));
            match capture.get(1) {
                Some(name) => {
                    pattern.push_str("([^/]+)");
                    param_names.push(ParamName::Named(name.as_str().to_string()));
                }
                None => {
                    pattern.push_str("(.*)");
                    param_names.push(ParamName::Wildcard(param_names.len()));
                }
            }
            last = whole.end();
        }
        pattern.push_str(&regex::escape(&template[last..]));
        pattern.push('$');

        let matcher = Regex::new(&pattern).map_err(|e| {
            debug!("路由模板{}编译失败: {}", template, e);
            Exception::InvalidRoute(template.clone())
        })?;
        debug_assert_eq!(param_names.len() + 1, matcher.captures_len());
        debug!("路由模板{}编译为{}", template, pattern);

        Ok(Self {
            template,
            matcher,
            param_names,
            handler,
            format,
        })
    }

    /// 对完整路径做锚定匹配，成功时按参数顺序返回各捕获组的文本
    pub fn matches(&self, path: &str) -> Option<Vec<String>> {
        let captures = self.matcher.captures(path)?;
        Some(
            captures
                .iter()
                .skip(1)
                .map(|m| m.map_or_else(String::new, |m| m.as_str().to_string()))
                .collect(),
        )
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn regex(&self) -> &str {
        self.matcher.as_str()
    }

    pub fn param_names(&self) -> &[ParamName] {
        &self.param_names
    }

    /// 第 `index` 个捕获组的参数名
    pub fn param(&self, index: usize) -> Option<&ParamName> {
        self.param_names.get(index)
    }

    pub fn handler(&self) -> Arc<dyn Handler> {
        Arc::clone(&self.handler)
    }

    pub fn format(&self) -> Option<ResponseFormat> {
        self.format
    }

    pub(crate) fn set_format(&mut self, format: ResponseFormat) {
        self.format = Some(format);
    }
}

impl fmt::Debug for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutePattern")
            .field("template", &self.template)
            .field("regex", &self.matcher.as_str())
            .field("param_names", &self.param_names)
            .field("format", &self.format)
            .finish()
    }
}
