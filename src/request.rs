// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 请求解析模块
//!
//! 从连接中读取一个极简的 HTTP/1.1 请求：
//! 1. 请求行（方法与路径），仅支持 GET 与 POST；
//! 2. POST 请求的标头，只关心 `Content-Length`；
//! 3. POST 请求的正文，恰好读取 `Content-Length` 个字节；
//! 4. GET 请求的查询字符串，按 `&` 与 `=` 拆分并做百分号解码。

use crate::{exception::Exception, param::*};

use log::{debug, warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use std::borrow::Cow;

/// 已读取完毕的请求
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    method: HttpRequestMethod,
    /// 请求行中的原始路径（含查询字符串）
    raw_path: String,
    /// 用于路由匹配的路径，GET 请求已去掉查询字符串
    path: String,
    /// 解码后的查询参数，保持出现顺序，尚未去重
    query: Vec<(String, String)>,
    body: Option<String>,
}

impl Request {
    /// 从连接中读取并解析一个请求。
    ///
    /// # 错误处理
    /// 请求行为空或格式错误、方法不受支持、`Content-Length` 非法以及读取失败都会返回错误，
    /// 调用方应直接关闭连接而不发送任何响应。
    pub async fn read_from<R>(reader: &mut R, id: u128) -> Result<Self, Exception>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            return Err(Exception::EmptyRequest);
        }
        let (method, raw_path) = parse_request_line(trim_line(&line))?;
        debug!("[ID{}]请求行: {} {}", id, method, raw_path);

        match method {
            HttpRequestMethod::Get => {
                let (path, query) = match raw_path.split_once('?') {
                    Some((path, query)) => (path.to_string(), parse_query(query, id)),
                    None => (raw_path.clone(), Vec::new()),
                };
                Ok(Self {
                    method,
                    raw_path,
                    path,
                    query,
                    body: None,
                })
            }
            HttpRequestMethod::Post => {
                let content_length = read_content_length(reader, id).await?;
                let body = read_body(reader, content_length, id).await?;
                Ok(Self {
                    method,
                    path: raw_path.clone(),
                    raw_path,
                    query: Vec::new(),
                    body: Some(body),
                })
            }
        }
    }
}

impl Request {
    pub fn method(&self) -> HttpRequestMethod {
        self.method
    }

    pub fn raw_path(&self) -> &str {
        &self.raw_path
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    pub(crate) fn into_parts(self) -> (HttpRequestMethod, String, String, Vec<(String, String)>, Option<String>) {
        (self.method, self.raw_path, self.path, self.query, self.body)
    }
}

fn trim_line(line: &str) -> &str {
    line.trim_end_matches(['\r', '\n'])
}

/// 解析请求行，例如 `GET /hello/world.json HTTP/1.1`。
///
/// 按空白拆分，第一个词是方法，第二个词是路径，协议版本不做校验。
pub fn parse_request_line(line: &str) -> Result<(HttpRequestMethod, String), Exception> {
    let mut tokens = line.split_whitespace();
    let method = tokens.next().ok_or(Exception::EmptyRequest)?;
    let path = tokens.next().ok_or(Exception::MalformedRequestLine)?;
    let method = HttpRequestMethod::from_token(method).ok_or(Exception::UnsupportedRequestMethod)?;
    Ok((method, path.to_string()))
}

async fn read_content_length<R>(reader: &mut R, id: u128) -> Result<u64, Exception>
where
    R: AsyncBufRead + Unpin,
{
    let mut content_length = 0;
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            break;
        }
        let header = trim_line(&line);
        if header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-length") {
                content_length = value
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| Exception::InvalidContentLength)?;
            }
        }
    }
    debug!("[ID{}]Content-Length: {}", id, content_length);
    Ok(content_length)
}

async fn read_body<R>(reader: &mut R, len: u64, id: u128) -> Result<String, Exception>
where
    R: AsyncBufRead + Unpin,
{
    let mut buffer = Vec::new();
    reader.take(len).read_to_end(&mut buffer).await?;
    if (buffer.len() as u64) < len {
        warn!("[ID{}]正文不完整：期望{}字节，实际{}字节", id, len, buffer.len());
        return Err(Exception::Io(std::io::ErrorKind::UnexpectedEof));
    }
    match String::from_utf8(buffer) {
        Ok(body) => Ok(body),
        Err(e) => {
            warn!("[ID{}]请求正文不是合法的UTF-8，非法字节已被替换", id);
            Ok(String::from_utf8_lossy(e.as_bytes()).into_owned())
        }
    }
}

/// 解析查询字符串，例如 `name=world&foo=bar`。
///
/// 每一对按第一个 `=` 拆分，`+` 视为空格，键和值都按 UTF-8 做百分号解码。
/// 缺少 `=` 或无法解码的参数对只记录警告并丢弃。
pub fn parse_query(query: &str, id: u128) -> Vec<(String, String)> {
    let mut params = Vec::new();
    for pair in query.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (key, value) = match pair.split_once('=') {
            Some(kv) => kv,
            None => {
                warn!("[ID{}]查询参数{}缺少'='，已丢弃", id, pair);
                continue;
            }
        };
        match (decode_component(key), decode_component(value)) {
            (Some(k), Some(v)) => params.push((k, v)),
            _ => warn!("[ID{}]无法解码查询参数: {}", id, pair),
        }
    }
    params
}

/// `%` 后必须紧跟两个十六进制数字，否则整个分量无法解码
fn decode_component(s: &str) -> Option<String> {
    let bytes = s.as_bytes();
    let escapes_valid = bytes.iter().enumerate().all(|(i, &b)| {
        b != b'%'
            || (bytes.get(i + 1).is_some_and(u8::is_ascii_hexdigit)
                && bytes.get(i + 2).is_some_and(u8::is_ascii_hexdigit))
    });
    if !escapes_valid {
        return None;
    }
    let s: Cow<str> = if s.contains('+') {
        Cow::Owned(s.replace('+', " "))
    } else {
        Cow::Borrowed(s)
    };
    urlencoding::decode(&s).map(Cow::into_owned).ok()
}
