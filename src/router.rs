// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 路由表模块
//!
//! GET 与 POST 各自维护一个有序的路由列表。查找时按注册顺序逐个尝试，
//! 第一个匹配的模板胜出，不做任何“更具体优先”的排序，
//! 因此更具体的路由需要先于更宽泛的路由注册。
//!
//! 注册只能在监听开始前进行：`Server::listen` 会把路由表移入 `Arc`，之后只读共享。

use crate::{
    context::Handler,
    exception::Exception,
    param::HttpRequestMethod,
    response::ResponseFormat,
    route::RoutePattern,
};

use log::debug;

use std::sync::Arc;

#[derive(Debug, Default)]
pub struct RouteTable {
    get: Vec<RoutePattern>,
    post: Vec<RoutePattern>,
}

/// 刚注册的路由，可以为它绑定专属的响应格式
pub struct RouteHandle<'a> {
    route: &'a mut RoutePattern,
}

impl<'a> RouteHandle<'a> {
    /// 为该路由指定响应格式，优先于服务器默认格式
    pub fn format(self, format: ResponseFormat) -> Self {
        self.route.set_format(format);
        self
    }

    pub fn template(&self) -> &str {
        self.route.template()
    }
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        method: HttpRequestMethod,
        template: &str,
        handler: Arc<dyn Handler>,
    ) -> Result<RouteHandle<'_>, Exception> {
        let route = RoutePattern::compile(template, handler, None)?;
        debug!("注册{}路由: {}", method, route.template());
        let routes = self.routes_mut(method);
        routes.push(route);
        match routes.last_mut() {
            Some(route) => Ok(RouteHandle { route }),
            None => Err(Exception::InvalidRoute(template.to_string())),
        }
    }

    /// 按注册顺序查找第一个匹配的路由，返回路由及其捕获值
    pub fn lookup(&self, method: HttpRequestMethod, path: &str) -> Option<(&RoutePattern, Vec<String>)> {
        self.routes(method)
            .iter()
            .find_map(|route| route.matches(path).map(|captures| (route, captures)))
    }

    pub fn routes(&self, method: HttpRequestMethod) -> &[RoutePattern] {
        match method {
            HttpRequestMethod::Get => &self.get,
            HttpRequestMethod::Post => &self.post,
        }
    }

    pub fn len(&self) -> usize {
        self.get.len() + self.post.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn routes_mut(&mut self, method: HttpRequestMethod) -> &mut Vec<RoutePattern> {
        match method {
            HttpRequestMethod::Get => &mut self.get,
            HttpRequestMethod::Post => &mut self.post,
        }
    }
}
