//! 极简单行协议
//!
//! 这不是完整的 HTTP 实现。客户端请求只读取第一行（到 `\r` 为止），
//! 请求头和请求体全部忽略；响应永远是 `200 OK` + `text/html` + `Connection: close`。

use std::io::{self, BufReader, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

/// 路径中包含该片段即视为表单提交
pub const SUBMISSION_MARKER: &str = "/configuration";

/// 请求行最大长度；超出时只保留前面的部分并标记为超长
pub const MAX_REQUEST_LINE: usize = 2048;

// 关闭连接前最多丢弃的剩余请求字节数
const DRAIN_LIMIT: usize = 16 * 1024;

/// 客户端发送的第一行，例如 `GET /configuration?netName=Home HTTP/1.1`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    line: String,
    oversized: bool,
}

impl RequestLine {
    pub fn new(line: impl Into<String>) -> Self {
        Self {
            line: line.into(),
            oversized: false,
        }
    }

    pub fn from_bytes(raw: &[u8]) -> Self {
        Self::new(String::from_utf8_lossy(raw))
    }

    /// 读到 `MAX_REQUEST_LINE` 仍未遇到行尾的请求行
    pub fn truncated(raw: &[u8]) -> Self {
        Self {
            oversized: true,
            ..Self::from_bytes(raw)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.line
    }

    /// 行尾之前被截断，内容不完整
    pub fn is_oversized(&self) -> bool {
        self.oversized
    }

    /// 请求目标，即方法之后的部分（含查询参数）
    pub fn target(&self) -> &str {
        self.line.split_whitespace().nth(1).unwrap_or("")
    }

    pub fn path(&self) -> &str {
        let target = self.target();
        target.split_once('?').map_or(target, |(path, _)| path)
    }

    pub fn is_submission(&self) -> bool {
        self.path().contains(SUBMISSION_MARKER)
    }
}

impl std::fmt::Display for RequestLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.line)
    }
}

/// 阻塞读取一行，最多等待 `timeout`
///
/// 连接在发送任何数据之前关闭时返回 `Ok(None)`。
pub fn read_request_line(
    stream: &TcpStream,
    timeout: Duration,
) -> io::Result<Option<RequestLine>> {
    stream.set_nonblocking(false)?;
    // Some(0) 会被拒绝
    stream.set_read_timeout(Some(timeout.max(Duration::from_millis(1))))?;

    let mut raw = Vec::new();
    let mut received = false;

    for byte in BufReader::new(stream).bytes() {
        let byte = byte?;
        received = true;
        if byte == b'\r' || byte == b'\n' {
            break;
        }
        raw.push(byte);
        if raw.len() >= MAX_REQUEST_LINE {
            return Ok(Some(RequestLine::truncated(&raw)));
        }
    }

    if !received {
        return Ok(None);
    }

    Ok(Some(RequestLine::from_bytes(&raw)))
}

/// 读超时在不同平台上表现为不同的错误类型
pub fn is_timeout(err: &io::Error) -> bool {
    matches!(err.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}

pub fn write_response<W: Write>(out: &mut W, body: &str) -> io::Result<()> {
    out.write_all(b"HTTP/1.1 200 OK\r\n")?;
    out.write_all(b"Content-Type: text/html\r\n")?;
    out.write_all(b"Connection: close\r\n")?;
    out.write_all(b"\r\n")?;
    out.write_all(body.as_bytes())?;
    out.write_all(b"\r\n")?;
    out.flush()
}

/// 关闭写方向后等待客户端断开
///
/// 接收缓冲区里还有未读数据时直接关闭会发送 RST，客户端可能收不到完整页面。
pub fn close_gracefully(stream: &TcpStream, timeout: Duration) {
    let _ = stream.shutdown(Shutdown::Write);
    let _ = stream.set_read_timeout(Some(timeout.max(Duration::from_millis(1))));

    let mut reader = stream;
    let mut buf = [0u8; 256];
    let mut drained = 0;
    while drained < DRAIN_LIMIT {
        match reader.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => drained += n,
        }
    }
}
