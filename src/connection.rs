// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 连接处理模块
//!
//! 每个连接只服务一个请求，处理流程是一个单向的状态机：
//!
//! 读取请求行 → 读取标头与正文（POST）/ 解析查询字符串（GET）→ 路由匹配
//! → 绑定参数 → 调用处理器 → 发送响应 → 关闭连接
//!
//! 任何一步失败都会直接进入“关闭连接”，且连接只会被关闭一次。
//! 处理器在阻塞线程池中执行，即使发生 panic 也不会影响连接的关闭。

use crate::{
    context::RequestContext,
    exception::Exception,
    request::Request,
    response::{ResponseFormat, ResponseFormatter},
    route::ParamName,
    router::RouteTable,
};

use log::{debug, error, info, warn};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    time::Instant,
};

/// 所有连接共享的只读设置
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    /// 路由未指定格式时使用的格式，为 `None` 时使用纯文本
    pub default_format: Option<ResponseFormat>,
    /// 发送文件时每次读取的字节数
    pub chunk_size: usize,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            default_format: None,
            chunk_size: 262144,
        }
    }
}

/// # 连接处理器
///
/// 负责单个连接的完整生命周期。函数返回时读写两端都已被释放，Socket 随之关闭。
pub async fn handle_connection<S>(
    stream: S,
    id: u128,
    routes: Arc<RouteTable>,
    options: Arc<ConnectionOptions>,
) where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (reader, mut writer) = tokio::io::split(stream);
    let mut reader = BufReader::new(reader);

    let request = match Request::read_from(&mut reader, id).await {
        Ok(request) => request,
        Err(Exception::Io(kind)) => {
            error!("[ID{}]读取请求时遇到错误: {}", id, kind);
            close(&mut writer, id).await;
            return;
        }
        Err(e) => {
            warn!("[ID{}]无法解析请求: {}，连接将被关闭", id, e);
            close(&mut writer, id).await;
            return;
        }
    };
    debug!("[ID{}]HTTP请求接收完毕", id);

    let start_time = Instant::now();
    let method = request.method();
    let path = request.raw_path().to_string();
    let default_format = options.default_format;

    let formatter = match tokio::task::spawn_blocking(move || {
        dispatch(request, &routes, default_format, id)
    })
    .await
    {
        Ok(formatter) => formatter,
        Err(e) => {
            error!("[ID{}]处理任务异常结束: {}", id, e);
            close(&mut writer, id).await;
            return;
        }
    };

    info!(
        "[ID{}] {}, {}, {}, {}ms",
        id,
        method,
        path,
        formatter.status().map_or_else(|| "-".to_string(), |s| s.to_string()),
        start_time.elapsed().as_millis()
    );

    match formatter
        .into_sink()
        .flush_to(&mut writer, options.chunk_size, id)
        .await
    {
        Ok(sent) => debug!("[ID{}]响应发送完毕，共{}字节", id, sent),
        Err(e) => error!("[ID{}]发送响应失败: {}", id, e),
    }
    close(&mut writer, id).await;
}

async fn close<W>(writer: &mut W, id: u128)
where
    W: AsyncWrite + Unpin,
{
    if let Err(e) = writer.shutdown().await {
        debug!("[ID{}]关闭连接时遇到错误: {}", id, e);
    }
}

/// 路由匹配、参数绑定并调用处理器，返回写好响应的格式化器
pub(crate) fn dispatch(
    request: Request,
    routes: &RouteTable,
    default_format: Option<ResponseFormat>,
    id: u128,
) -> ResponseFormatter {
    let (method, raw_path, path, query, body) = request.into_parts();
    let fallback = default_format.unwrap_or_default();

    let (route, captures) = match routes.lookup(method, &path) {
        Some(found) => found,
        None => {
            info!("[ID{}]{} {} 没有匹配的路由，返回404", id, method, path);
            let mut formatter = ResponseFormatter::new(fallback, id);
            formatter.not_found(None);
            return formatter;
        }
    };
    debug!("[ID{}]匹配路由: {}", id, route.template());

    let format = route.format().unwrap_or(fallback);
    let mut ctx = RequestContext::new(id, method, &raw_path, body, ResponseFormatter::new(format, id));

    // 查询参数先于路径参数写入，同名时查询参数优先
    for (key, value) in query {
        ctx.insert_param(key, value);
    }
    for (name, value) in route.param_names().iter().zip(captures) {
        match name {
            ParamName::Wildcard(_) => ctx.push_wildcard(value),
            ParamName::Named(name) => {
                ctx.insert_param(name.clone(), value);
            }
        }
    }

    let handler = route.handler();
    if let Err(cause) = panic::catch_unwind(AssertUnwindSafe(|| handler.handle(&mut ctx))) {
        error!("[ID{}]处理器发生panic: {}", id, panic_message(cause.as_ref()));
        if !ctx.formatter().header_sent() {
            ctx.formatter().error(None);
        }
    }
    ctx.into_formatter()
}

fn panic_message(cause: &(dyn Any + Send)) -> &str {
    if let Some(s) = cause.downcast_ref::<&str>() {
        s
    } else if let Some(s) = cause.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}
