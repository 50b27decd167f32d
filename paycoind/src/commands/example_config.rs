//! `example-config` subcommand

use abscissa_core::Runnable;
use tokio::{fs::File, io::AsyncWriteExt};

use crate::{
    cli::ExampleConfigCmd,
    commands::AsyncRunnable,
    config::PaycoindConfig,
    error::{Error, ErrorKind},
    fl,
};

impl AsyncRunnable for ExampleConfigCmd {
    async fn run(&self) -> Result<(), Error> {
        let output = PaycoindConfig::generate_example();

        let output_path = match self.output.as_deref() {
            None | Some("-") => None,
            Some(path) => Some(path),
        };
        if let Some(path) = output_path {
            let mut f = if self.force {
                File::create(path).await
            } else {
                File::create_new(path).await
            }
            .map_err(|e| ErrorKind::Generic.context(e))?;
            f.write_all(output.as_bytes())
                .await
                .map_err(|e| ErrorKind::Generic.context(e))?;
            println!("{}", fl!("config-written", conf = path));
        } else {
            println!("{output}")
        }

        Ok(())
    }
}

impl Runnable for ExampleConfigCmd {
    fn run(&self) {
        self.run_on_runtime();
    }
}
