// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 示例服务器
//!
//! 演示如何把 `tinyserver` 嵌入到一个程序中：
//! - `GET /`：纯文本问候
//! - `GET /hello/[name]`：HTML 问候页
//! - `GET /weather/[location]`：不带信封的 JSON
//! - `GET /files/*`：从 `www_root` 发送文件
//! - `POST /echo`：原样返回请求正文

use tinyserver::{Config, RequestContext, ResponseFormat, Server};

use log::{error, info};
use serde_derive::Serialize;
use tokio::runtime::Builder;

use std::{path::PathBuf, process};

#[derive(Serialize)]
struct Weather<'a> {
    location: &'a str,
    temperature: i32,
    summary: &'a str,
}

fn main() {
    // 日志初始化失败时仍然可以运行，只是没有日志输出
    if let Err(e) = log4rs::init_file("config/log4rs.yaml", Default::default()) {
        eprintln!("无法初始化日志系统: {}", e);
    }

    let config = Config::from_toml("config/development.toml");
    let root = PathBuf::from(config.www_root());
    info!("www root: {}", root.display());
    let port = config.port();

    let runtime = match Builder::new_multi_thread()
        .worker_threads(config.worker_threads())
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("无法创建Tokio运行时: {}", e);
            process::exit(1);
        }
    };

    let mut server = Server::from_config(config);
    if let Err(e) = register_routes(&mut server, root) {
        error!("路由注册失败: {}", e);
        process::exit(1);
    }

    if let Err(e) = runtime.block_on(server.listen(port)) {
        error!("服务器异常退出: {}", e);
        process::exit(1);
    }
}

fn register_routes(server: &mut Server, root: PathBuf) -> Result<(), tinyserver::Exception> {
    server.get("/", |ctx: &mut RequestContext| {
        ctx.write("Hello from tinyserver!");
    })?;

    server
        .get("/hello/[name]", |ctx: &mut RequestContext| {
            let name = ctx.param("name").unwrap_or("stranger").to_string();
            ctx.formatter()
                .html_page("Hello", &format!("Hello, {}!", name), "Greetings from tinyserver.");
        })?
        .format(ResponseFormat::Html);

    server
        .get("/weather/[location]", |ctx: &mut RequestContext| {
            let location = ctx.param("location").unwrap_or("unknown").to_string();
            ctx.write_json(&Weather {
                location: &location,
                temperature: 21,
                summary: "sunny",
            });
        })?
        .format(ResponseFormat::JsonUnwrapped);

    server
        .get("/files/*", move |ctx: &mut RequestContext| {
            let relative = ctx.wildcard_params().first().cloned().unwrap_or_default();
            if relative.split('/').any(|segment| segment == "..") {
                ctx.formatter().forbidden(None);
                return;
            }
            let path = root.join(relative.trim_start_matches('/'));
            if !path.is_file() {
                ctx.formatter().not_found(None);
                return;
            }
            ctx.write(path.to_string_lossy().into_owned());
        })?
        .format(ResponseFormat::File);

    server.post("/echo", |ctx: &mut RequestContext| {
        let body = ctx.body().unwrap_or("").to_string();
        ctx.write(body);
    })?;

    Ok(())
}
