use crate::response::ResponseFormat;

use log::{error, info, warn};
use num_cpus;
use serde_derive::Deserialize;

use std::fs;

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    www_root: String,
    port: u16,
    worker_threads: usize,
    local: bool,
    chunk_size: usize,
    max_connections: usize,
    default_format: Option<ResponseFormat>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            www_root: ".".to_string(),
            port: 8000,
            worker_threads: 0,
            local: true,
            chunk_size: 262144, // 256KB
            max_connections: 0,
            default_format: None,
        }
    }

    /// 从 TOML 文件读取配置。文件缺失或格式错误时记录日志并使用默认配置。
    pub fn from_toml(filename: &str) -> Self {
        let str_val = match fs::read_to_string(filename) {
            Ok(s) => s,
            Err(e) => {
                warn!("无法读取配置文件{}：{}，使用默认配置", filename, e);
                return Self::new().normalized();
            }
        };

        let raw_config: Config = match toml::from_str(&str_val) {
            Ok(t) => t,
            Err(e) => {
                error!("无法成功从配置文件构建配置对象，使用默认配置：{}", e);
                return Self::new().normalized();
            }
        };
        info!("配置文件{}已载入", filename);
        raw_config.normalized()
    }

    fn normalized(mut self) -> Self {
        if self.worker_threads == 0 {
            self.worker_threads = num_cpus::get();
        }
        if self.chunk_size == 0 {
            warn!("chunk_size被设置为0，该值将被改为默认的262144。");
            self.chunk_size = 262144;
        }
        self
    }
}

impl Config {
    pub fn www_root(&self) -> &str {
        &self.www_root
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    pub fn local(&self) -> bool {
        self.local
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// 同时处理的连接数上限，0 表示不限制
    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    pub fn default_format(&self) -> Option<ResponseFormat> {
        self.default_format
    }
}
