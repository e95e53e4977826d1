mod command;
mod featurizer;
mod schema;
mod util;

fn main() -> anyhow::Result<()> {
    command::run()
}
