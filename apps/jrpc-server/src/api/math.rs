use rpckit::{Endpoint, Module, Schema};

use super::{operands, Operands};

pub(super) fn module() -> Module {
    Module::new("math")
        .declare_models([("Pair", operands())])
        .add(
            Endpoint::new("addition", operands(), Schema::number(), |o: Operands| async move {
                anyhow::Ok(o.a + o.b)
            })
            .summary("Adds two numbers"),
        )
}
