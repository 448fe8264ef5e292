//! `fetch`/`download`: stream a remote resource into a local file.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use umod_terminal::markup::escape;
use umod_terminal::{Command, CommandContext, CommandHandler, LabelHandle, OutputDevice};
use umod_types::error::{Result, UmodError};

use super::FileSystem;
use crate::config::DownloadConfig;
use crate::module::{self, Handler, Module, dispatch, verbs_of};
use crate::net::http::HttpClient;
use crate::net::{Url, is_well_formed};

/// Resource downloader module.
pub struct Downloader {
    client: HttpClient,
    buffer_size: usize,
}

impl Downloader {
    const COMMANDS: &'static [(&'static str, Handler<Self>)] =
        &[("fetch", Self::cmd_fetch), ("download", Self::cmd_fetch)];

    pub fn new(config: &DownloadConfig) -> Self {
        Self {
            client: HttpClient::new(config),
            buffer_size: config.buffer_size.max(1),
        }
    }

    fn cmd_fetch(&self, ctx: &mut CommandContext, cmd: &Command, out: &mut dyn OutputDevice) -> bool {
        let mut positional = cmd.simple_args().iter();

        let url = match cmd.non_empty_named_arg("url") {
            Some(url) => url.to_string(),
            None => match positional.next() {
                Some(url) => url.clone(),
                None => return fail(ctx, out, "$redURL of resource must be specified."),
            },
        };
        let parsed = match Url::parse(&url) {
            Some(parsed) if is_well_formed(&url) => parsed,
            _ => return fail(ctx, out, "$redURL is not well formed."),
        };

        let out_name = cmd
            .non_empty_named_arg("out")
            .map(str::to_string)
            .or_else(|| positional.next().cloned())
            .or_else(|| parsed.file_name().map(str::to_string));
        let Some(out_name) = out_name else {
            return fail(ctx, out, "$redCould not determine a file name for the resource.");
        };
        let dest = ctx.resolve(&out_name);

        let allowed = module::module::<FileSystem>(ctx).is_some_and(|fs| fs.security_check(&dest));
        if !allowed {
            log::warn!("blocked download destination {}", dest.display());
            return fail(ctx, out, "$redDestination path blocked due to security reasons.");
        }

        let mut size_label = None;
        match self.download(&parsed, &dest, out, &mut size_label) {
            Ok(read) => {
                log::info!("fetched {parsed} -> {} ({read} bytes)", dest.display());
                ctx.error_flag = false;
            },
            Err(e) => {
                log::warn!("fetch of {parsed} failed: {e}");
                out.write_static_line("Unknown error when fetching resource:");
                out.write_static_line(&escape(&e.to_string()));
                if let Some(label) = size_label {
                    out.set_label_text(label, "$redCancelled");
                }
                ctx.error_flag = true;
            },
        }
        true
    }

    /// Stream `url` into `dest`, reporting progress. Returns bytes written.
    fn download(
        &self,
        url: &Url,
        dest: &Path,
        out: &mut dyn OutputDevice,
        size_label: &mut Option<LabelHandle>,
    ) -> Result<u64> {
        let shown = escape(&url.to_string());
        let label = out.write_label(&format!("Requesting {shown}..."));

        let mut response = self.client.get(url)?;

        out.set_label_text(label, &format!("Downloading {shown}..."));
        let sizes = out.write_label("");
        *size_label = Some(sizes);

        let length = response.content_length().filter(|&len| len > 0);
        let bar = length.map(|_| out.write_progress_bar());
        let total = length.map_or_else(|| "unknown".to_string(), format_content_length);

        let mut file = File::create(dest)?;
        let result = copy_with_progress(&mut response, &mut file, self.buffer_size, |read| {
            if let (Some(bar), Some(len)) = (bar, length) {
                out.set_progress(bar, (read as f64 / len as f64) as f32);
            }
            out.set_label_text(sizes, &format!("{} / {total}", format_content_length(read)));
        });
        drop(file);

        match result {
            Ok(read) if length.is_some_and(|len| read < len) => {
                remove_partial(dest);
                Err(UmodError::Network(format!(
                    "connection closed after {read} of {} bytes",
                    length.unwrap_or_default()
                )))
            },
            Ok(read) => Ok(read),
            Err(e) => {
                remove_partial(dest);
                Err(e)
            },
        }
    }
}

fn remove_partial(dest: &Path) {
    if let Err(e) = std::fs::remove_file(dest) {
        log::warn!("could not remove {}: {e}", dest.display());
    }
}

fn fail(ctx: &mut CommandContext, out: &mut dyn OutputDevice, message: &str) -> bool {
    out.write_static_line(message);
    ctx.error_flag = true;
    true
}

fn copy_with_progress(
    reader: &mut impl Read,
    writer: &mut impl Write,
    buffer_size: usize,
    mut progress: impl FnMut(u64),
) -> Result<u64> {
    let mut buf = vec![0u8; buffer_size];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(UmodError::Network(format!("read body: {e}"))),
        };
        writer.write_all(&buf[..n])?;
        total += n as u64;
        progress(total);
    }
    writer.flush()?;
    Ok(total)
}

/// Run a nested `fetch` of `url` into `dest` (relative to the working
/// directory, or absolute). Returns whether the file arrived.
pub(crate) fn fetch_into(
    ctx: &mut CommandContext,
    out: &mut dyn OutputDevice,
    url: &str,
    dest: &str,
) -> bool {
    let line = format!("fetch url:\"{url}\" out:\"{dest}\"");
    if !ctx.execute(out, &line) {
        ctx.error_flag = true;
        return false;
    }
    !ctx.error_flag
}

/// Human-readable size: bytes below 1 KiB, otherwise KiB, MiB or GiB with
/// two decimals.
pub fn format_content_length(length: u64) -> String {
    const KIB: u64 = 1 << 10;
    const MIB: u64 = 1 << 20;
    const GIB: u64 = 1 << 30;
    match length {
        l if l < KIB => format!("{l} B"),
        l if l < MIB => format!("{:.2} KiB", l as f64 / KIB as f64),
        l if l < GIB => format!("{:.2} MiB", l as f64 / MIB as f64),
        l => format!("{:.2} GiB", l as f64 / GIB as f64),
    }
}

impl CommandHandler for Downloader {
    fn handle(&self, ctx: &mut CommandContext, cmd: &Command, out: &mut dyn OutputDevice) -> bool {
        dispatch(self, Self::COMMANDS, ctx, cmd, out)
    }
}

impl Module for Downloader {
    fn name(&self) -> &'static str {
        "Downloader"
    }

    fn verbs(&self) -> Vec<&'static str> {
        verbs_of(Self::COMMANDS)
    }
}
