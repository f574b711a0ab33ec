//! Scripted counter session against the in-memory host.
//!
//! `cargo run -p counter -- + + - i +` clicks Increment (`+`), Decrement (`-`)
//! or toggles the inspector (`i`), printing the host tree after every step.

use trellis_core::prelude::*;
use trellis_devtools::Inspector;

#[allow(non_snake_case)]
fn Counter(hooks: &mut Hooks<'_>, _props: &Props) -> RenderResult {
    let (count, set_count) = hooks.use_state(0i32)?;

    Ok(h("section")
        .attr("class", "counter")
        .with_children(vec![
            h("p").child(format!("Count: {count}")).into(),
            h("button")
                .attr("id", "inc")
                .on("click", {
                    let set_count = set_count.clone();
                    move || {
                        set_count.update(|c| c + 1);
                    }
                })
                .child("Increment")
                .into(),
            h("button")
                .attr("id", "dec")
                .on("click", move || {
                    set_count.update(|c| c - 1);
                })
                .child("Decrement")
                .into(),
        ])
        .into())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let container = MemNode::container();
    let root = create_container(MemoryHost::new(), container.clone());
    let mut inspector = Inspector::new();

    if let RenderOutcome::Aborted(err) = root.render(Element::component(Counter)) {
        anyhow::bail!("initial render failed: {err}");
    }
    println!("{}", container.to_markup());

    for step in std::env::args().skip(1) {
        let target = match step.as_str() {
            "+" => "inc",
            "-" => "dec",
            "i" => {
                inspector.toggle();
                continue;
            }
            other => anyhow::bail!("unknown step `{other}` (expected `+`, `-` or `i`)"),
        };
        let Some(button) = container.find_by_attr("id", target) else {
            anyhow::bail!("no button #{target} in the tree");
        };
        button.click();
        log::info!("clicked #{target}");

        println!("{}", container.to_markup());
        if let Some(frame) = root.inspect(|r| inspector.frame(r)) {
            println!("{frame}");
        }
    }
    Ok(())
}
