use cranelift_codegen::ir::{Block as IrBlock, InstBuilder, Value};
use tracing::trace;

use crate::error::CodegenError;
use crate::parser::{Block, Expr};

use super::FunctionTranslator;

/// Jump targets of the innermost enclosing loop.
#[derive(Clone, Copy, Debug)]
pub(super) struct LoopTargets {
    continue_block: IrBlock,
    break_block: IrBlock,
}

impl FunctionTranslator<'_> {
    fn translate_cond(&mut self, cond: &Expr) -> Result<Value, CodegenError> {
        let v = self.translate_expr(cond)?;
        Ok(self.to_bool(v))
    }

    /// Continues in a fresh block with no predecessors, so anything after
    /// a jump still lands in a well-formed (unreachable) block.
    fn switch_to_dead_block(&mut self) {
        let block = self.builder.create_block();
        self.builder.switch_to_block(block);
    }

    pub(super) fn translate_if(
        &mut self,
        cond: &Expr,
        then: &Block,
        else_block: Option<&Block>,
    ) -> Result<(), CodegenError> {
        trace!(has_else = else_block.is_some(), "if");
        let cond = self.translate_cond(cond)?;

        let then_block = self.builder.create_block();
        let merge_block = self.builder.create_block();
        let else_ir_block = else_block.map(|_| self.builder.create_block());

        self.builder.ins().brif(
            cond,
            then_block,
            &[],
            else_ir_block.unwrap_or(merge_block),
            &[],
        );

        self.builder.switch_to_block(then_block);
        self.translate_block(then)?;
        self.builder.ins().jump(merge_block, &[]);

        if let (Some(block), Some(ir_block)) = (else_block, else_ir_block) {
            self.builder.switch_to_block(ir_block);
            self.translate_block(block)?;
            self.builder.ins().jump(merge_block, &[]);
        }

        self.builder.switch_to_block(merge_block);
        Ok(())
    }

    pub(super) fn translate_while(&mut self, cond: &Expr, body: &Block) -> Result<(), CodegenError> {
        trace!("while");
        let cond_block = self.builder.create_block();
        let loop_block = self.builder.create_block();
        let after_block = self.builder.create_block();

        self.builder.ins().jump(cond_block, &[]);

        self.builder.switch_to_block(cond_block);
        let cond = self.translate_cond(cond)?;
        self.builder.ins().brif(cond, loop_block, &[], after_block, &[]);

        self.builder.switch_to_block(loop_block);
        self.loops.push(LoopTargets {
            continue_block: cond_block,
            break_block: after_block,
        });
        let result = self.translate_block(body);
        self.loops.pop();
        result?;
        self.builder.ins().jump(cond_block, &[]);

        self.builder.switch_to_block(after_block);
        Ok(())
    }

    pub(super) fn translate_break(&mut self) -> Result<(), CodegenError> {
        let targets = self
            .loops
            .last()
            .copied()
            .ok_or(CodegenError::LoopControlOutsideLoop("break"))?;
        self.builder.ins().jump(targets.break_block, &[]);
        self.switch_to_dead_block();
        Ok(())
    }

    pub(super) fn translate_continue(&mut self) -> Result<(), CodegenError> {
        let targets = self
            .loops
            .last()
            .copied()
            .ok_or(CodegenError::LoopControlOutsideLoop("continue"))?;
        self.builder.ins().jump(targets.continue_block, &[]);
        self.switch_to_dead_block();
        Ok(())
    }
}
