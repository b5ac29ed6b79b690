use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::{
    colorize::{
        workdir::{file_stem, WorkingDir},
        ColorizeFuture, ColorizedVideo, Colorizer,
    },
    config::{check_render_factor, ColorizeConfig},
    error::{ColorizationError, Result},
    progress::{Phase, ProgressLine, ProgressSink},
};

/// Colorizer backed by an external worker program
///
/// The worker runs inside a fresh `colorize_<stem>` directory next to the
/// input. Lines it prints as `{"progress":{...}}` are forwarded to the
/// progress sink; everything else is logged at debug level. On success it
/// must have written `<result_dir>/<stem>.mp4` inside that directory.
#[derive(Debug, Clone)]
pub struct CommandColorizer {
    program: String,
    args: Vec<String>,
    result_dir: PathBuf,
}

impl CommandColorizer {
    pub fn new(
        program: impl Into<String>,
        args: Vec<String>,
        result_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            result_dir: result_dir.into(),
        }
    }

    pub fn from_config(config: &ColorizeConfig) -> Self {
        Self::new(config.program.clone(), config.args.clone(), config.result_dir.clone())
    }

    /// Substitute `{input}`, `{render_factor}`, `{stem}` and `{workdir}`
    pub fn expand_args(&self, input: &Path, render_factor: u32, workdir: &Path) -> Vec<String> {
        let input = input.to_string_lossy();
        let stem = file_stem(Path::new(input.as_ref()));
        let workdir = workdir.to_string_lossy();
        let render_factor = render_factor.to_string();

        self.args
            .iter()
            .map(|arg| {
                arg.replace("{input}", &input)
                    .replace("{render_factor}", &render_factor)
                    .replace("{stem}", &stem)
                    .replace("{workdir}", &workdir)
            })
            .collect()
    }

    async fn run(
        &self,
        input: &Path,
        render_factor: u32,
        progress: &dyn ProgressSink,
    ) -> Result<ColorizedVideo> {
        check_render_factor(render_factor)?;

        // The worker runs elsewhere, so hand it an absolute path
        let input = tokio::fs::canonicalize(input)
            .await
            .map_err(|e| ColorizationError::Failed {
                path: input.display().to_string(),
                reason: format!("cannot resolve input: {}", e),
            })?;
        let stem = file_stem(&input);
        let workdir = WorkingDir::create_for(&input)?;
        let args = self.expand_args(&input, render_factor, workdir.path());

        info!("🖌️  Colorizing {:?} (render factor {})", input, render_factor);
        debug!("Running {} {}", self.program, args.join(" "));

        let mut child = Command::new(&self.program)
            .args(&args)
            .current_dir(workdir.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ColorizationError::LaunchFailed {
                program: self.program.clone(),
                reason: e.to_string(),
            })?;

        let stderr_task = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut bytes = Vec::new();
                let _ = stderr.read_to_end(&mut bytes).await;
                String::from_utf8_lossy(&bytes).into_owned()
            })
        });

        let worker_failed = |reason: String| ColorizationError::Failed {
            path: input.display().to_string(),
            reason,
        };

        // Workers may print raw bytes, so lines are decoded lossily
        if let Some(stdout) = child.stdout.take() {
            let mut lines = BufReader::new(stdout).split(b'\n');
            while let Some(raw) = lines
                .next_segment()
                .await
                .map_err(|e| worker_failed(format!("cannot read worker output: {}", e)))?
            {
                let line = String::from_utf8_lossy(&raw);
                match ProgressLine::parse(&line) {
                    Some(report) => progress.report(Phase::Colorize, report.progress),
                    None if !line.trim().is_empty() => debug!("[{}] {}", self.program, line.trim()),
                    None => {}
                }
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| worker_failed(format!("cannot wait for worker: {}", e)))?;
        let stderr = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };

        if !status.success() {
            return Err(worker_failed(format!(
                "{} exited with {}: {}",
                self.program,
                status,
                tail(&stderr)
            ))
            .into());
        }

        let result = workdir
            .path()
            .join(&self.result_dir)
            .join(format!("{}.mp4", stem));
        if !result.is_file() {
            return Err(ColorizationError::MissingResult {
                path: result.display().to_string(),
            }
            .into());
        }

        debug!("Colorized result at {:?}", result);
        Ok(ColorizedVideo::in_workdir(result, workdir))
    }
}

impl Colorizer for CommandColorizer {
    fn name(&self) -> &str {
        &self.program
    }

    fn colorize<'a>(
        &'a self,
        input: &'a Path,
        render_factor: u32,
        progress: &'a dyn ProgressSink,
    ) -> ColorizeFuture<'a> {
        Box::pin(self.run(input, render_factor, progress))
    }
}

/// Last few lines of worker stderr
fn tail(text: &str) -> String {
    let lines: Vec<&str> = text.trim().lines().collect();
    let start = lines.len().saturating_sub(5);
    lines[start..].join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ColorizerError, ConfigError};
    use crate::progress::{NullProgress, ProgressEvent};
    use std::sync::Mutex;
    use tempfile::tempdir;

    fn sh_worker(dir: &Path, script: &str) -> CommandColorizer {
        let script_path = dir.join("worker.sh");
        std::fs::write(&script_path, script).unwrap();
        CommandColorizer::new(
            "sh",
            vec![
                script_path.display().to_string(),
                "--input".into(),
                "{input}".into(),
                "--render-factor".into(),
                "{render_factor}".into(),
            ],
            "video/result",
        )
    }

    #[test]
    fn test_expand_args() {
        let colorizer = CommandColorizer::from_config(&ColorizeConfig::default());
        let args = colorizer.expand_args(
            Path::new("/videos/reel.mp4"),
            35,
            Path::new("/videos/colorize_reel"),
        );
        assert_eq!(args, vec!["--input", "/videos/reel.mp4", "--render-factor", "35"]);

        let custom = CommandColorizer::new(
            "w",
            vec!["{stem}-{render_factor}".into(), "{workdir}".into()],
            "out",
        );
        assert_eq!(
            custom.expand_args(Path::new("a/b.mp4"), 21, Path::new("wd")),
            vec!["b-21", "wd"]
        );
    }

    #[test]
    fn test_tail_keeps_last_lines() {
        let text = "1\n2\n3\n4\n5\n6\n7\n";
        assert_eq!(tail(text), "3 | 4 | 5 | 6 | 7");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_worker_success_and_progress() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("reel.mp4");
        std::fs::write(&input, b"bw").unwrap();

        let colorizer = sh_worker(
            dir.path(),
            r#"mkdir -p video/result
echo '{"progress":{"current":1,"total":2,"percentage":50.0}}'
echo 'loading weights'
echo '{"progress":{"current":2,"total":2,"percentage":100.0}}'
printf 'color-%s' "$4" > "video/result/$(basename "$2" .mp4).mp4"
"#,
        );

        let events = Mutex::new(Vec::new());
        let sink = |phase: Phase, event: ProgressEvent| {
            assert_eq!(phase, Phase::Colorize);
            events.lock().unwrap().push(event.current);
        };

        let video = colorizer.colorize(&input, 21, &sink).await.unwrap();
        let workdir = dir.path().join("colorize_reel");
        assert!(video.path().starts_with(workdir.canonicalize().unwrap()));
        assert_eq!(std::fs::read(video.path()).unwrap(), b"color-21");
        assert_eq!(*events.lock().unwrap(), vec![1, 2]);

        let dest = dir.path().join("out/reel_color.mp4");
        video.persist(&dest).await.unwrap();
        assert!(dest.is_file());
        assert!(!workdir.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_worker_output_with_invalid_utf8() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("reel.mp4");
        std::fs::write(&input, b"bw").unwrap();

        let colorizer = sh_worker(
            dir.path(),
            r#"mkdir -p video/result
printf 'frame \377\376 done\n'
printf '\377 warming up\n' >&2
echo '{"progress":{"current":1,"total":1,"percentage":100.0}}'
printf 'color' > "video/result/$(basename "$2" .mp4).mp4"
"#,
        );

        let events = Mutex::new(Vec::new());
        let sink = |_phase: Phase, event: ProgressEvent| events.lock().unwrap().push(event.current);

        let video = colorizer.colorize(&input, 21, &sink).await.unwrap();
        assert_eq!(std::fs::read(video.path()).unwrap(), b"color");
        assert_eq!(*events.lock().unwrap(), vec![1]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_worker_failure_cleans_up() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("reel.mp4");
        std::fs::write(&input, b"bw").unwrap();

        let colorizer = sh_worker(dir.path(), "echo 'CUDA out of memory' >&2\nexit 3\n");
        let err = colorizer.colorize(&input, 21, &NullProgress).await.unwrap_err();
        match err {
            ColorizerError::Colorization(ColorizationError::Failed { reason, .. }) => {
                assert!(reason.contains("CUDA out of memory"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!dir.path().join("colorize_reel").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_worker_without_result() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("reel.mp4");
        std::fs::write(&input, b"bw").unwrap();

        let colorizer = sh_worker(dir.path(), "exit 0\n");
        let err = colorizer.colorize(&input, 21, &NullProgress).await.unwrap_err();
        assert!(matches!(
            err,
            ColorizerError::Colorization(ColorizationError::MissingResult { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("reel.mp4");
        std::fs::write(&input, b"bw").unwrap();

        let colorizer = CommandColorizer::new("no-such-colorizer-7c1e", Vec::new(), "video/result");
        let err = colorizer.colorize(&input, 21, &NullProgress).await.unwrap_err();
        assert!(matches!(
            err,
            ColorizerError::Colorization(ColorizationError::LaunchFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_zero_render_factor() {
        let colorizer = CommandColorizer::from_config(&ColorizeConfig::default());
        let err = colorizer
            .colorize(Path::new("whatever.mp4"), 0, &NullProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, ColorizerError::Config(ConfigError::InvalidValue { .. })));
    }
}
