// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

#[cfg(test)]
mod security_tests {
    //! # 协议健壮性测试
    //!
    //! 畸形报文、非法 `Content-Length` 与处理器 panic 都只影响当前连接：
    //! 连接被关闭，服务器继续处理后续请求。

    use tinyserver::{RequestContext, ResponseFormat, Server};

    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::{TcpListener, TcpStream},
        sync::oneshot,
        time::{timeout, Duration},
    };

    async fn start() -> (u16, oneshot::Sender<()>) {
        let mut server = Server::new();
        server
            .get("/ping", |ctx: &mut RequestContext| ctx.write("pong"))
            .unwrap();
        server
            .post("/upload", |ctx: &mut RequestContext| {
                let len = ctx.body().map_or(0, str::len);
                ctx.write(len.to_string());
            })
            .unwrap();
        server
            .get("/panic", |_: &mut RequestContext| panic!("boom"))
            .unwrap();
        server
            .get("/panic-json", |_: &mut RequestContext| panic!("boom"))
            .unwrap()
            .format(ResponseFormat::Json);
        server
            .get("/files/*", |ctx: &mut RequestContext| {
                if ctx.wildcard_params()[0].split('/').any(|s| s == "..") {
                    ctx.formatter().forbidden(None);
                } else {
                    ctx.write("ok");
                }
            })
            .unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (tx, rx) = oneshot::channel::<()>();
        tokio::spawn(server.serve(listener, async move {
            let _ = rx.await;
        }));
        (port, tx)
    }

    /// 发送原始字节并读取到连接关闭，设置硬超时防止测试永久阻塞
    async fn send_raw(port: u16, request: &[u8]) -> String {
        let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        // 服务端可能在读完之前就关闭连接，写入失败同样视为被拒绝
        let _ = stream.write_all(request).await;
        let _ = stream.shutdown().await;
        let mut response = Vec::new();
        let mut buffer = [0u8; 4096];
        loop {
            let read = timeout(Duration::from_secs(5), stream.read(&mut buffer))
                .await
                .expect("服务端未关闭连接");
            match read {
                Ok(0) | Err(_) => break,
                Ok(n) => response.extend_from_slice(&buffer[..n]),
            }
        }
        String::from_utf8_lossy(&response).into_owned()
    }

    async fn assert_still_serving(port: u16) {
        let response = send_raw(port, b"GET /ping HTTP/1.1\r\n\r\n").await;
        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.ends_with("pong"));
    }

    fn extract_status_code(response: &str) -> u16 {
        response
            .lines()
            .next()
            .and_then(|line| line.split_whitespace().nth(1))
            .and_then(|code| code.parse().ok())
            .unwrap_or(0)
    }

    #[tokio::test]
    async fn test_malformed_request_lines() {
        let (port, _shutdown) = start().await;
        let attacks: Vec<&[u8]> = vec![
            b"",
            b"\r\n",
            b"GET\r\n\r\n",
            b"DELETE /ping HTTP/1.1\r\n\r\n",
            b"get /ping HTTP/1.1\r\n\r\n",
            b"\x00\x01\x02\x03\r\n\r\n",
        ];

        for attack in attacks {
            let response = send_raw(port, attack).await;
            assert!(response.is_empty(), "畸形请求不应得到响应: {:?}", attack);
        }
        assert_still_serving(port).await;
    }

    #[tokio::test]
    async fn test_invalid_content_length() {
        let (port, _shutdown) = start().await;
        let attacks: Vec<&[u8]> = vec![
            b"POST /upload HTTP/1.1\r\nContent-Length: abc\r\n\r\nhello",
            b"POST /upload HTTP/1.1\r\nContent-Length: -5\r\n\r\nhello",
            b"POST /upload HTTP/1.1\r\nContent-Length: 99999999999999999999999\r\n\r\n",
        ];

        for attack in attacks {
            assert!(send_raw(port, attack).await.is_empty());
        }
        assert_still_serving(port).await;
    }

    #[tokio::test]
    async fn test_truncated_body_is_dropped() {
        let (port, _shutdown) = start().await;
        let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        stream
            .write_all(b"POST /upload HTTP/1.1\r\nContent-Length: 100\r\n\r\nshort")
            .await
            .unwrap();
        // 关闭写端后服务端读到 EOF，放弃该请求
        stream.shutdown().await.unwrap();

        let mut response = Vec::new();
        let _ = timeout(Duration::from_secs(5), stream.read_to_end(&mut response))
            .await
            .unwrap();
        assert!(response.is_empty());
        assert_still_serving(port).await;
    }

    #[tokio::test]
    async fn test_body_not_utf8_is_replaced() {
        let (port, _shutdown) = start().await;
        let response = send_raw(
            port,
            b"POST /upload HTTP/1.1\r\nContent-Length: 3\r\n\r\n\xff\xfe\xfd",
        )
        .await;
        assert_eq!(extract_status_code(&response), 200);
        // 每个非法字节被替换为 U+FFFD，UTF-8 编码占 3 字节
        assert!(response.ends_with("9"));
    }

    #[tokio::test]
    async fn test_handler_panic_returns_500() {
        let (port, _shutdown) = start().await;
        let response = send_raw(port, b"GET /panic HTTP/1.1\r\n\r\n").await;
        assert_eq!(extract_status_code(&response), 500);
        assert!(response.ends_with("An error occured."));

        let response = send_raw(port, b"GET /panic-json HTTP/1.1\r\n\r\n").await;
        assert_eq!(extract_status_code(&response), 500);
        assert!(response.contains("\"status\":\"500\""));

        assert_still_serving(port).await;
    }

    #[tokio::test]
    async fn test_path_traversal_in_wildcard() {
        let (port, _shutdown) = start().await;
        let response = send_raw(port, b"GET /files/../../etc/passwd HTTP/1.1\r\n\r\n").await;
        assert_eq!(extract_status_code(&response), 403);

        let response = send_raw(port, b"GET /files/docs/readme HTTP/1.1\r\n\r\n").await;
        assert_eq!(extract_status_code(&response), 200);
    }

    #[tokio::test]
    async fn test_oversized_query_string() {
        let (port, _shutdown) = start().await;
        let request = format!("GET /ping?{} HTTP/1.1\r\n\r\n", "a=1&".repeat(10_000));
        let response = send_raw(port, request.as_bytes()).await;
        assert_eq!(extract_status_code(&response), 200);
    }

    #[tokio::test]
    async fn test_silent_client_does_not_block_others() {
        let (port, _shutdown) = start().await;
        // 建立连接但不发送任何数据
        let _idle = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        assert_still_serving(port).await;
    }
}
