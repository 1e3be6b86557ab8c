// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 响应格式化模块
//!
//! 处理器不直接拼接报文，而是通过 `ResponseFormatter` 输出结果。格式化器负责：
//! 1. 按所选格式（纯文本、HTML、JSON、文件）序列化数据；
//! 2. 在每个响应中至多写入一次状态行与固定的响应头；
//! 3. 将字节按顺序写入 `OutputSink`，连接关闭时再统一发送到 Socket。
//!
//! 文件内容不会读入内存，`OutputSink` 只记录路径与长度，发送时分块读取。

use crate::{
    param::*,
    util::HtmlBuilder,
};

use bytes::BytesMut;
use log::{debug, error, warn};
use serde_derive::{Deserialize, Serialize};
use serde_json::Value;
use tokio::{
    fs::File as TokioFile,
    io::{AsyncReadExt, AsyncWrite, AsyncWriteExt},
};

use std::{
    fs::{self, File},
    io,
    path::{Path, PathBuf},
};

/// 响应格式。
///
/// 在注册路由或设置服务器默认格式时选定，每个请求据此创建一个新的 `ResponseFormatter`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFormat {
    /// 纯文本，默认格式
    #[default]
    Plain,
    /// HTML 页面
    Html,
    /// 带信封的 JSON：`{"status", "message", "data"}`
    Json,
    /// 不带信封的 JSON，数据原样序列化
    JsonUnwrapped,
    /// 文件内容，MIME 类型由后缀名决定
    File,
}

impl ResponseFormat {
    /// JSON 格式，`wrapped` 决定是否使用信封
    pub fn json(wrapped: bool) -> Self {
        if wrapped {
            ResponseFormat::Json
        } else {
            ResponseFormat::JsonUnwrapped
        }
    }

    /// 格式自带的 MIME 类型。文件格式要等到确定文件路径后才能得知。
    pub fn mime_type(&self) -> Option<&'static str> {
        match self {
            ResponseFormat::Plain => Some("text/plain"),
            ResponseFormat::Html => Some("text/html"),
            ResponseFormat::Json | ResponseFormat::JsonUnwrapped => Some("application/json"),
            ResponseFormat::File => None,
        }
    }
}

/// 传给 `success` 的数据
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text(String),
    Json(Value),
}

impl Payload {
    fn into_text(self) -> String {
        match self {
            Payload::Text(s) => s,
            Payload::Json(Value::String(s)) => s,
            Payload::Json(v) => v.to_string(),
        }
    }

    fn into_json(self) -> Value {
        match self {
            Payload::Text(s) => Value::String(s),
            Payload::Json(v) => v,
        }
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Payload::Text(s.to_string())
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Payload::Text(s)
    }
}

impl From<&String> for Payload {
    fn from(s: &String) -> Self {
        Payload::Text(s.clone())
    }
}

impl From<Value> for Payload {
    fn from(v: Value) -> Self {
        Payload::Json(v)
    }
}

/// 响应头的写入状态，每个响应从 `Pending` 开始，写入后进入 `Sent` 且不再回退
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderState {
    Pending,
    Sent,
}

#[derive(Debug)]
enum Segment {
    Bytes(BytesMut),
    File { path: PathBuf, len: u64 },
}

/// 响应的输出缓冲。
///
/// 内存中的字节与待发送的文件按写入顺序保存，`flush_to` 时依次写出。
#[derive(Debug, Default)]
pub struct OutputSink {
    segments: Vec<Segment>,
}

impl OutputSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&mut self, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        match self.segments.last_mut() {
            Some(Segment::Bytes(buf)) => buf.extend_from_slice(data),
            _ => self.segments.push(Segment::Bytes(BytesMut::from(data))),
        }
    }

    /// 记录一个文件，发送时从磁盘读取恰好 `len` 个字节
    pub fn write_file(&mut self, path: PathBuf, len: u64) {
        self.segments.push(Segment::File { path, len });
    }

    /// 预计发送的总字节数
    pub fn len(&self) -> u64 {
        self.segments
            .iter()
            .map(|s| match s {
                Segment::Bytes(buf) => buf.len() as u64,
                Segment::File { len, .. } => *len,
            })
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// 将缓冲内容按顺序写入 `writer`，返回实际发送的字节数。
    ///
    /// 文件以 `chunk_size` 为单位分块读取。文件在发送过程中变短时记录警告，响应正文被截断。
    pub async fn flush_to<W>(self, writer: &mut W, chunk_size: usize, id: u128) -> io::Result<u64>
    where
        W: AsyncWrite + Unpin,
    {
        let mut sent = 0u64;
        for segment in self.segments {
            match segment {
                Segment::Bytes(buf) => {
                    writer.write_all(&buf).await?;
                    sent += buf.len() as u64;
                }
                Segment::File { path, len } => {
                    sent += stream_file(&path, len, writer, chunk_size, id).await?;
                }
            }
        }
        writer.flush().await?;
        Ok(sent)
    }
}

async fn stream_file<W>(
    path: &Path,
    len: u64,
    writer: &mut W,
    chunk_size: usize,
    id: u128,
) -> io::Result<u64>
where
    W: AsyncWrite + Unpin,
{
    let file = TokioFile::open(path).await?;
    let mut file = file.take(len);
    let mut buffer = vec![0u8; chunk_size.max(1)];
    let mut total_sent = 0u64;
    debug!("[ID{}]开始流式传输{}，文件大小: {} bytes", id, path.display(), len);
    loop {
        let n = file.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        writer.write_all(&buffer[..n]).await?;
        total_sent += n as u64;
    }
    if total_sent < len {
        warn!(
            "[ID{}]文件{}在发送过程中变短，仅发送了{}/{}字节",
            id,
            path.display(),
            total_sent,
            len
        );
    }
    Ok(total_sent)
}

#[derive(Serialize)]
struct Envelope<'a> {
    status: String,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a Value>,
}

/// 绑定到单个响应的格式化器
#[derive(Debug)]
pub struct ResponseFormatter {
    id: u128,
    format: ResponseFormat,
    mime_type: Option<&'static str>,
    header: HeaderState,
    status: Option<StatusCode>,
    sink: OutputSink,
}

impl ResponseFormatter {
    pub fn new(format: ResponseFormat, id: u128) -> Self {
        Self {
            id,
            format,
            mime_type: format.mime_type(),
            header: HeaderState::Pending,
            status: None,
            sink: OutputSink::new(),
        }
    }

    /// 200 OK。
    ///
    /// 纯文本与 HTML 直接写入字符串；JSON 按模式序列化；文件格式把数据当作文件路径。
    pub fn success(&mut self, data: impl Into<Payload>) {
        let data = data.into();
        match self.format {
            ResponseFormat::Plain | ResponseFormat::Html => {
                let text = data.into_text();
                self.write(StatusCode::Success, Some(&text));
            }
            ResponseFormat::Json | ResponseFormat::JsonUnwrapped => {
                self.write_json(StatusCode::Success, StatusCode::Success.reason(), Some(data.into_json()));
            }
            ResponseFormat::File => match data {
                Payload::Text(path) | Payload::Json(Value::String(path)) => self.send_file(&path),
                other => {
                    error!("[ID{}]文件格式只接受文件路径，收到: {:?}", self.id, other);
                }
            },
        }
    }

    /// 先把任意可序列化的数据转换为 JSON 值，再交给 `success`
    pub fn success_json<T: serde::Serialize>(&mut self, data: &T) {
        match serde_json::to_value(data) {
            Ok(value) => self.success(value),
            Err(e) => {
                error!("[ID{}]序列化响应数据失败: {}", self.id, e);
                self.error(None);
            }
        }
    }

    /// 用内置的 HTML 模板生成一个 200 页面
    pub fn html_page(&mut self, title: &str, heading: &str, detail: &str) {
        let html = HtmlBuilder::new(title, heading, detail).build();
        self.write(StatusCode::Success, Some(&html));
    }

    /// 403 Forbidden
    pub fn forbidden(&mut self, message: Option<&str>) {
        self.write_status(StatusCode::Forbidden, message);
    }

    /// 404 Not Found
    pub fn not_found(&mut self, message: Option<&str>) {
        self.write_status(StatusCode::NotFound, message);
    }

    /// 500 Internal Server Error
    pub fn error(&mut self, message: Option<&str>) {
        self.write_status(StatusCode::Error, message);
    }

    /// 写入响应头（若尚未写入），随后原样写入 `data`
    pub fn write_raw(&mut self, code: StatusCode, data: &[u8]) {
        self.write_header(code);
        self.sink.write(data);
    }

    pub fn format(&self) -> ResponseFormat {
        self.format
    }

    pub fn mime_type(&self) -> Option<&'static str> {
        self.mime_type
    }

    pub fn header_state(&self) -> HeaderState {
        self.header
    }

    pub fn header_sent(&self) -> bool {
        self.header == HeaderState::Sent
    }

    /// 已写入状态行的状态码，响应头尚未写入时为 `None`
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn sink(&self) -> &OutputSink {
        &self.sink
    }

    pub fn into_sink(self) -> OutputSink {
        self.sink
    }

    fn write_status(&mut self, code: StatusCode, message: Option<&str>) {
        match self.format {
            ResponseFormat::Plain | ResponseFormat::File => {
                if self.mime_type.is_none() {
                    self.mime_type = Some("text/plain");
                }
                let text = message.unwrap_or(code.description());
                self.write(code, Some(text));
            }
            ResponseFormat::Html => {
                let html = HtmlBuilder::from_status_code(code, message).build();
                self.write(code, Some(&html));
            }
            ResponseFormat::Json | ResponseFormat::JsonUnwrapped => {
                self.write_json(code, message.unwrap_or(code.reason()), None);
            }
        }
    }

    fn write_json(&mut self, code: StatusCode, message: &str, data: Option<Value>) {
        let body = match self.format {
            ResponseFormat::Json => {
                let envelope = Envelope {
                    status: code.code().to_string(),
                    message,
                    data: data.as_ref(),
                };
                serde_json::to_string(&envelope)
            }
            _ => match data {
                Some(value) => serde_json::to_string(&value),
                None => {
                    self.write(code, None);
                    return;
                }
            },
        };
        match body {
            Ok(json) => self.write(code, Some(&json)),
            Err(e) => {
                error!("[ID{}]JSON序列化失败: {}", self.id, e);
                self.write(StatusCode::Error, None);
            }
        }
    }

    fn write(&mut self, code: StatusCode, data: Option<&str>) {
        self.write_header(code);
        if let Some(d) = data {
            self.sink.write(d.as_bytes());
        }
    }

    fn write_header(&mut self, code: StatusCode) {
        if self.header == HeaderState::Sent {
            debug!("[ID{}]响应头已写入，忽略状态行{}", self.id, code);
            return;
        }
        let mime = self.mime_type.unwrap_or(DEFAULT_MIME);
        let header = [
            "HTTP/1.1 ",
            &code.status_line(),
            CRLF,
            "Cache-Control: ",
            CACHE_CONTROL,
            CRLF,
            "Content-Type: ",
            mime,
            "; charset=",
            CHARSET,
            CRLF,
            "Connection: ",
            CONNECTION,
            CRLF,
            "Server: ",
            SERVER_NAME,
            CRLF,
            CRLF,
        ]
        .concat();
        self.sink.write(header.as_bytes());
        self.header = HeaderState::Sent;
        self.status = Some(code);
    }

    fn send_file(&mut self, path: &str) {
        let metadata = match fs::metadata(path) {
            Ok(meta) if meta.is_file() => meta,
            Ok(_) => {
                error!("[ID{}]{}不是普通文件，无法发送", self.id, path);
                return;
            }
            Err(e) => {
                error!("[ID{}]无法获取文件{}的元数据: {}", self.id, path, e);
                return;
            }
        };
        if let Err(e) = File::open(path) {
            error!("[ID{}]无法读取文件{}: {}", self.id, path, e);
            return;
        }
        let mime = mime_from_path(path);
        debug!("[ID{}]MIME类型: {}", self.id, mime);
        self.mime_type = Some(mime);
        self.write_header(StatusCode::Success);
        self.sink.write_file(PathBuf::from(path), metadata.len());
    }
}
