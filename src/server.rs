// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 服务器模块
//!
//! `Server` 的生命周期分为两个阶段：
//! 1. **注册阶段**：通过 `get`、`post` 注册路由，通过 `set_response_format` 设置默认格式；
//! 2. **监听阶段**：`listen` 或 `serve` 消耗 `Server`，路由表被移入 `Arc` 后只读共享，
//!    因此请求处理期间不需要任何锁。
//!
//! 每接受一个连接就启动一个 Tokio 任务处理它。默认不限制并发连接数，
//! 配置了 `max_connections` 时由信号量限制同时处理的连接数量。

use crate::{
    config::Config,
    connection::{handle_connection, ConnectionOptions},
    context::Handler,
    exception::Exception,
    param::HttpRequestMethod,
    response::ResponseFormat,
    router::{RouteHandle, RouteTable},
};

use log::{debug, error, info};
use tokio::{net::TcpListener, sync::Semaphore};

use std::{
    future::{self, Future},
    net::{Ipv4Addr, SocketAddrV4},
    sync::Arc,
    time::Duration,
};

const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

pub struct Server {
    config: Config,
    routes: RouteTable,
    default_format: Option<ResponseFormat>,
}

impl Server {
    pub fn new() -> Self {
        Self::from_config(Config::new())
    }

    pub fn from_config(config: Config) -> Self {
        let default_format = config.default_format();
        Self {
            config,
            routes: RouteTable::new(),
            default_format,
        }
    }

    /// 注册 GET 路由
    pub fn get<H>(&mut self, template: &str, handler: H) -> Result<RouteHandle<'_>, Exception>
    where
        H: Handler + 'static,
    {
        self.route(HttpRequestMethod::Get, template, handler)
    }

    /// 注册 POST 路由
    pub fn post<H>(&mut self, template: &str, handler: H) -> Result<RouteHandle<'_>, Exception>
    where
        H: Handler + 'static,
    {
        self.route(HttpRequestMethod::Post, template, handler)
    }

    pub fn route<H>(
        &mut self,
        method: HttpRequestMethod,
        template: &str,
        handler: H,
    ) -> Result<RouteHandle<'_>, Exception>
    where
        H: Handler + 'static,
    {
        self.routes.register(method, template, Arc::new(handler))
    }

    /// 设置服务器默认响应格式，覆盖配置文件中的 `default_format`
    pub fn set_response_format(&mut self, format: ResponseFormat) {
        self.default_format = Some(format);
    }

    pub fn response_format(&self) -> Option<ResponseFormat> {
        self.default_format
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 绑定端口并持续接受连接，正常情况下永不返回。
    ///
    /// 配置中 `local` 为真时只监听 127.0.0.1，否则监听 0.0.0.0。
    pub async fn listen(self, port: u16) -> Result<(), Exception> {
        let address = match self.config.local() {
            true => Ipv4Addr::LOCALHOST,
            false => Ipv4Addr::UNSPECIFIED,
        };
        info!("服务端将在{}:{}上监听Socket连接", address, port);
        let listener = match TcpListener::bind(SocketAddrV4::new(address, port)).await {
            Ok(listener) => listener,
            Err(e) => {
                error!("无法绑定端口：{}，错误：{}", port, e);
                return Err(Exception::BindFailed(port));
            }
        };
        self.serve(listener, future::pending()).await
    }

    /// 在已绑定的监听器上接受连接，直到 `shutdown` 完成。
    ///
    /// 停止接受新连接后，已经开始处理的连接会继续在后台完成。
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), Exception>
    where
        F: Future<Output = ()>,
    {
        let address = listener.local_addr()?;
        info!("Server started: http://{}", address);

        let routes = Arc::new(self.routes);
        let options = Arc::new(ConnectionOptions {
            default_format: self.default_format,
            chunk_size: self.config.chunk_size(),
        });
        let limiter = match self.config.max_connections() {
            0 => None,
            n => {
                info!("并发连接数上限: {}", n);
                Some(Arc::new(Semaphore::new(n)))
            }
        };

        tokio::pin!(shutdown);
        let mut id: u128 = 0;

        loop {
            let permit = match &limiter {
                Some(semaphore) => tokio::select! {
                    permit = Arc::clone(semaphore).acquire_owned() => match permit {
                        Ok(permit) => Some(permit),
                        Err(_) => break,
                    },
                    _ = &mut shutdown => break,
                },
                None => None,
            };

            let (stream, addr) = tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok(connection) => connection,
                    Err(e) => {
                        error!("无法接受连接: {}", e);
                        // 文件描述符耗尽等错误会持续出现，稍等再重试
                        tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                        continue;
                    }
                },
                _ = &mut shutdown => break,
            };
            debug!("[ID{}]新的连接：{}", id, addr);

            let routes = Arc::clone(&routes);
            let options = Arc::clone(&options);
            tokio::spawn(async move {
                handle_connection(stream, id, routes, options).await;
                drop(permit);
            });
            id += 1;
        }

        info!("服务端已停止接受新连接");
        Ok(())
    }
}

impl Default for Server {
    fn default() -> Self {
        Self::new()
    }
}
