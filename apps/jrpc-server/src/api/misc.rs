use rpckit::{Endpoint, Module, Schema};

use super::{operands, Operands};

pub(super) fn module() -> Module {
    Module::new("misc")
        .add(
            Endpoint::new("uppercase", Schema::string(), Schema::string(), |s: String| async move {
                anyhow::Ok(s.to_uppercase())
            })
            .summary("Convert a string to uppercase"),
        )
        .add(
            Endpoint::new("division", operands(), Schema::number(), division)
                .summary("Divide two numbers")
                .description(
                    "This function divides two numbers and may throw an error if the second number is zero.",
                ),
        )
}

async fn division(input: Operands) -> anyhow::Result<f64> {
    if input.b == 0.0 {
        anyhow::bail!("Division by zero");
    }
    Ok(input.a / input.b)
}
