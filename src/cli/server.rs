use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::Parser;
use log::{info, warn};
use tokio::net::TcpListener;

use crate::cli::SubCommandExtend;
use crate::convert::ConversionCache;
use crate::fs::LocalFs;
use crate::server::{self, AppState, ServerOptions};
use crate::store::GroupStore;
use crate::Opts;

#[derive(Parser, Debug, Clone)]
pub struct ServerCommand {
    /// 监听端口
    #[arg(short, long, default_value_t = 8080, env = "DUPE_REVIEW_PORT")]
    pub port: u16,
    /// 监听地址
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,
    /// CR2 转换超时时间，单位为秒
    #[arg(long, value_name = "SECS", default_value_t = 60)]
    pub convert_timeout: u64,
    /// 分组查询（包括读取文件元数据）超时时间，单位为秒
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    pub read_timeout: u64,
    /// 删除接口的请求体大小上限
    #[arg(long, value_name = "BYTES", default_value_t = 64 * 1024)]
    pub body_limit: usize,
}

impl SubCommandExtend for ServerCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let image_root = opts.image_root()?;
        if !image_root.is_dir() {
            bail!("图片根目录不存在: {}", image_root.display());
        }

        let store = Arc::new(GroupStore::load(&opts.duplicates)?);
        let cache = Arc::new(
            ConversionCache::new(Duration::from_secs(self.convert_timeout))
                .context("创建临时目录失败")?,
        );

        let options = ServerOptions {
            read_timeout: Duration::from_secs(self.read_timeout),
            body_limit: self.body_limit,
        };

        // 创建应用状态
        let state = AppState::new(store, image_root.clone(), Arc::new(LocalFs), cache.clone(), options);

        // 创建应用
        let app = server::create_app(state);

        // 启动服务器
        let addr = format!("{}:{}", self.host, self.port);
        info!(
            "服务器启动：http://{}，图片目录 {}，分组文件 {}",
            addr,
            image_root.display(),
            opts.duplicates.display()
        );
        let listener = TcpListener::bind(&addr).await?;
        axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

        info!("服务器已停止");
        match Arc::try_unwrap(cache) {
            Ok(cache) => cache.close()?,
            Err(_) => warn!("转换缓存仍被占用，临时目录将在进程退出时清理"),
        }

        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("无法监听退出信号: {e}");
        std::future::pending::<()>().await;
    }
    info!("收到退出信号，正在关闭服务器");
}
