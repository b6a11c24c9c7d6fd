use std::collections::HashMap;

use cranelift_codegen::ir::condcodes::{FloatCC, IntCC};
use cranelift_codegen::ir::{
    types, AbiParam, FuncRef, GlobalValue, InstBuilder, MemFlags, StackSlot, Value,
};
use cranelift_frontend::FunctionBuilder;
use cranelift_jit::JITModule;
use cranelift_module::{DataId, FuncId, Linkage, Module};
use tracing::trace;

use crate::engine::MOD_SYMBOL;
use crate::error::CodegenError;
use crate::parser::{
    ArithOp, Block, Expr, Ident, LogicalOp, ScalarType, Stmt, UnaryArithOp, UnaryLogicalOp,
    VarDecl,
};

use super::codegen::{ir_type, module_error, slot_data, FunctionInfo};
use super::control_flow::LoopTargets;
use super::{Location, Storage, SymbolTable};

type Result<T> = std::result::Result<T, CodegenError>;

/// How a value is represented in the IR. Comparisons and logical operators
/// produce `Bool`, an `i8` holding 0 or 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum Kind {
    Int,
    Float,
    Bool,
}

#[derive(Clone, Copy, Debug)]
pub(super) struct Typed {
    pub value: Value,
    pub kind: Kind,
}

impl Typed {
    fn new(value: Value, kind: Kind) -> Self {
        Self { value, kind }
    }
}

/// Translates the body of one function.
pub(super) struct FunctionTranslator<'a> {
    pub(super) builder: FunctionBuilder<'a>,
    module: &'a mut JITModule,
    symbol_table: &'a mut SymbolTable,
    functions: &'a HashMap<String, FunctionInfo>,
    mod_func: &'a mut Option<FuncId>,
    return_type: ScalarType,
    return_slot: Option<StackSlot>,
    pub(super) loops: Vec<LoopTargets>,
    func_refs: HashMap<FuncId, FuncRef>,
    global_values: HashMap<DataId, GlobalValue>,
}

impl<'a> FunctionTranslator<'a> {
    pub fn new(
        builder: FunctionBuilder<'a>,
        module: &'a mut JITModule,
        symbol_table: &'a mut SymbolTable,
        functions: &'a HashMap<String, FunctionInfo>,
        mod_func: &'a mut Option<FuncId>,
        return_type: ScalarType,
        return_slot: Option<StackSlot>,
    ) -> Self {
        Self {
            builder,
            module,
            symbol_table,
            functions,
            mod_func,
            return_type,
            return_slot,
            loops: vec![],
            func_refs: HashMap::new(),
            global_values: HashMap::new(),
        }
    }

    /// Emits the single `return` in the current block and finalizes the function.
    pub fn finish(mut self) {
        match self.return_slot {
            Some(slot) => {
                let ty = ir_type(self.return_type);
                let value = self.builder.ins().stack_load(ty, slot, 0);
                self.builder.ins().return_(&[value]);
            }
            None => {
                self.builder.ins().return_(&[]);
            }
        }
        self.builder.seal_all_blocks();
        self.builder.finalize();
    }

    pub fn translate_block(&mut self, block: &Block) -> Result<()> {
        for stmt in &block.0 {
            self.translate_stmt(stmt)?;
        }
        Ok(())
    }

    fn translate_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::Decl(decl) => self.translate_local(decl),
            Stmt::Block(block) => self.translate_block(block),
            Stmt::Expr(expr) => self.translate_expr(expr).map(|_| ()),
            Stmt::Return(expr) => self.translate_return(expr.as_ref()),
            Stmt::If(cond, then, else_block) => self.translate_if(cond, then, else_block.as_ref()),
            Stmt::While(cond, body) => self.translate_while(cond, body),
            Stmt::Break => self.translate_break(),
            Stmt::Continue => self.translate_continue(),
        }
    }

    fn translate_local(&mut self, decl: &VarDecl) -> Result<()> {
        if decl.ty == ScalarType::Void {
            return Err(CodegenError::InvalidType {
                name: decl.name.clone(),
                ty: decl.ty.to_string(),
            });
        }

        let slot = self.builder.create_sized_stack_slot(slot_data());
        let zero = self.zero(decl.ty);
        self.builder.ins().stack_store(zero, slot, 0);
        self.symbol_table.declare_local(
            &decl.name,
            Storage {
                location: Location::Local(slot),
                ty: decl.ty,
                is_const: decl.is_const,
            },
        )?;

        if let Some(init) = &decl.init {
            let value = self.translate_expr(init)?;
            let value = self.convert(value, decl.ty);
            self.builder.ins().stack_store(value, slot, 0);
        }
        Ok(())
    }

    /// Records the value in the return slot. The block keeps going, so the
    /// last `return` executed wins.
    fn translate_return(&mut self, expr: Option<&Expr>) -> Result<()> {
        let Some(expr) = expr else {
            return Ok(());
        };
        let value = self.translate_expr(expr)?;
        if let Some(slot) = self.return_slot {
            let value = self.convert(value, self.return_type);
            self.builder.ins().stack_store(value, slot, 0);
        }
        Ok(())
    }

    fn zero(&mut self, ty: ScalarType) -> Value {
        match ty {
            ScalarType::Float64 => self.builder.ins().f64const(0.0),
            _ => self.builder.ins().iconst(types::I64, 0),
        }
    }

    fn to_int(&mut self, v: Typed) -> Value {
        match v.kind {
            Kind::Int => v.value,
            Kind::Bool => self.builder.ins().uextend(types::I64, v.value),
            Kind::Float => self.builder.ins().fcvt_to_sint_sat(types::I64, v.value),
        }
    }

    fn to_float(&mut self, v: Typed) -> Value {
        match v.kind {
            Kind::Float => v.value,
            Kind::Int | Kind::Bool => {
                let n = self.to_int(v);
                self.builder.ins().fcvt_from_sint(types::F64, n)
            }
        }
    }

    /// Truth value of any scalar as an `i8`.
    pub(super) fn to_bool(&mut self, v: Typed) -> Value {
        match v.kind {
            Kind::Bool => v.value,
            Kind::Int => self.builder.ins().icmp_imm(IntCC::NotEqual, v.value, 0),
            Kind::Float => {
                let zero = self.builder.ins().f64const(0.0);
                self.builder.ins().fcmp(FloatCC::NotEqual, v.value, zero)
            }
        }
    }

    fn convert(&mut self, v: Typed, ty: ScalarType) -> Value {
        match ty {
            ScalarType::Float64 => self.to_float(v),
            _ => self.to_int(v),
        }
    }

    fn storage_kind(ty: ScalarType) -> Kind {
        match ty {
            ScalarType::Float64 => Kind::Float,
            _ => Kind::Int,
        }
    }

    pub(super) fn translate_expr(&mut self, expr: &Expr) -> Result<Typed> {
        match expr {
            Expr::Int(n) => {
                trace!(n, "int literal");
                Ok(Typed::new(self.builder.ins().iconst(types::I64, *n), Kind::Int))
            }
            Expr::Float(n) => {
                trace!(n, "float literal");
                Ok(Typed::new(self.builder.ins().f64const(*n), Kind::Float))
            }
            Expr::Ident(ident) => self.translate_load(ident),
            Expr::Call(name, args) => self.translate_call(name, args),
            Expr::BinaryArith(op, lhs, rhs) => self.translate_arith(*op, lhs, rhs),
            Expr::BinaryLogical(op, lhs, rhs) => self.translate_logical(*op, lhs, rhs),
            Expr::UnaryArith(UnaryArithOp::Neg, operand) => {
                trace!("negation");
                let v = self.translate_expr(operand)?;
                if v.kind == Kind::Float {
                    Ok(Typed::new(self.builder.ins().fneg(v.value), Kind::Float))
                } else {
                    let n = self.to_int(v);
                    Ok(Typed::new(self.builder.ins().ineg(n), Kind::Int))
                }
            }
            Expr::UnaryLogical(UnaryLogicalOp::Not, operand) => {
                trace!("logical not");
                let v = self.translate_expr(operand)?;
                let b = self.to_bool(v);
                let not = self.builder.ins().icmp_imm(IntCC::Equal, b, 0);
                Ok(Typed::new(not, Kind::Bool))
            }
            Expr::Assign(ident, rhs) => self.translate_assign(ident, rhs),
        }
    }

    fn global_value(&mut self, data_id: DataId) -> GlobalValue {
        if let Some(gv) = self.global_values.get(&data_id) {
            return *gv;
        }
        let gv = self
            .module
            .declare_data_in_func(data_id, self.builder.func);
        self.global_values.insert(data_id, gv);
        gv
    }

    fn func_ref(&mut self, func_id: FuncId) -> FuncRef {
        if let Some(func_ref) = self.func_refs.get(&func_id) {
            return *func_ref;
        }
        let func_ref = self
            .module
            .declare_func_in_func(func_id, self.builder.func);
        self.func_refs.insert(func_id, func_ref);
        func_ref
    }

    fn translate_load(&mut self, ident: &Ident) -> Result<Typed> {
        trace!(name = %ident.name, "load");
        let storage = self.symbol_table.resolve(&ident.name)?;
        let ty = ir_type(storage.ty);
        let value = match storage.location {
            Location::Local(slot) => self.builder.ins().stack_load(ty, slot, 0),
            Location::Global(data_id) => {
                let gv = self.global_value(data_id);
                let ptr_ty = self.module.target_config().pointer_type();
                let addr = self.builder.ins().global_value(ptr_ty, gv);
                self.builder.ins().load(ty, MemFlags::trusted(), addr, 0)
            }
        };
        Ok(Typed::new(value, Self::storage_kind(storage.ty)))
    }

    fn translate_assign(&mut self, ident: &Ident, rhs: &Expr) -> Result<Typed> {
        trace!(name = %ident.name, "assign");
        let storage = self.symbol_table.resolve(&ident.name)?;
        if storage.is_const {
            return Err(CodegenError::ConstantAssignment(ident.name.clone()));
        }

        let value = self.translate_expr(rhs)?;
        let value = self.convert(value, storage.ty);
        match storage.location {
            Location::Local(slot) => {
                self.builder.ins().stack_store(value, slot, 0);
            }
            Location::Global(data_id) => {
                let gv = self.global_value(data_id);
                let ptr_ty = self.module.target_config().pointer_type();
                let addr = self.builder.ins().global_value(ptr_ty, gv);
                self.builder.ins().store(MemFlags::trusted(), value, addr, 0);
            }
        }
        Ok(Typed::new(value, Self::storage_kind(storage.ty)))
    }

    fn translate_call(&mut self, name: &str, args: &[Expr]) -> Result<Typed> {
        trace!(name, args = args.len(), "call");
        let functions = self.functions;
        let info = functions
            .get(name)
            .ok_or_else(|| CodegenError::UndeclaredFunction(name.to_string()))?;
        if info.params.len() != args.len() {
            return Err(CodegenError::ArityMismatch {
                name: name.to_string(),
                expected: info.params.len(),
                found: args.len(),
            });
        }

        let mut values = vec![];
        for (arg, ty) in args.iter().zip(&info.params) {
            let v = self.translate_expr(arg)?;
            values.push(self.convert(v, *ty));
        }

        let func_ref = self.func_ref(info.id);
        let call = self.builder.ins().call(func_ref, &values);
        match info.return_type {
            ScalarType::Void => Ok(Typed::new(
                self.builder.ins().iconst(types::I64, 0),
                Kind::Int,
            )),
            ty => Ok(Typed::new(
                self.builder.inst_results(call)[0],
                Self::storage_kind(ty),
            )),
        }
    }

    /// `mod(i64, i64) -> i64`, imported on first use.
    fn mod_func(&mut self) -> Result<FuncId> {
        if let Some(id) = *self.mod_func {
            return Ok(id);
        }
        let mut sig = self.module.make_signature();
        sig.params.push(AbiParam::new(types::I64));
        sig.params.push(AbiParam::new(types::I64));
        sig.returns.push(AbiParam::new(types::I64));
        let id = self
            .module
            .declare_function(MOD_SYMBOL, Linkage::Import, &sig)
            .map_err(module_error)?;
        *self.mod_func = Some(id);
        Ok(id)
    }

    fn translate_arith(&mut self, op: ArithOp, lhs: &Expr, rhs: &Expr) -> Result<Typed> {
        trace!(?op, "binary arithmetic");
        let lhs = self.translate_expr(lhs)?;
        let rhs = self.translate_expr(rhs)?;

        if op == ArithOp::Mod {
            let a = self.to_int(lhs);
            let b = self.to_int(rhs);
            let func_id = self.mod_func()?;
            let func_ref = self.func_ref(func_id);
            let call = self.builder.ins().call(func_ref, &[a, b]);
            return Ok(Typed::new(self.builder.inst_results(call)[0], Kind::Int));
        }

        if lhs.kind == Kind::Float || rhs.kind == Kind::Float {
            let a = self.to_float(lhs);
            let b = self.to_float(rhs);
            let ins = self.builder.ins();
            let value = match op {
                ArithOp::Add => ins.fadd(a, b),
                ArithOp::Sub => ins.fsub(a, b),
                ArithOp::Mul => ins.fmul(a, b),
                _ => ins.fdiv(a, b),
            };
            return Ok(Typed::new(value, Kind::Float));
        }

        let a = self.to_int(lhs);
        let b = self.to_int(rhs);
        if op == ArithOp::Div {
            return Ok(Typed::new(self.total_sdiv(a, b), Kind::Int));
        }
        let ins = self.builder.ins();
        let value = match op {
            ArithOp::Add => ins.iadd(a, b),
            ArithOp::Sub => ins.isub(a, b),
            _ => ins.imul(a, b),
        };
        Ok(Typed::new(value, Kind::Int))
    }

    /// `sdiv` that gives 0 instead of trapping when `b` is 0 or the
    /// quotient overflows (`i64::MIN / -1`), matching `mod`.
    fn total_sdiv(&mut self, a: Value, b: Value) -> Value {
        let builder = &mut self.builder;
        let is_zero = builder.ins().icmp_imm(IntCC::Equal, b, 0);
        let is_min = builder.ins().icmp_imm(IntCC::Equal, a, i64::MIN);
        let is_neg_one = builder.ins().icmp_imm(IntCC::Equal, b, -1);
        let overflows = builder.ins().band(is_min, is_neg_one);
        let undefined = builder.ins().bor(is_zero, overflows);

        let one = builder.ins().iconst(types::I64, 1);
        let divisor = builder.ins().select(undefined, one, b);
        let quotient = builder.ins().sdiv(a, divisor);
        let zero = builder.ins().iconst(types::I64, 0);
        builder.ins().select(undefined, zero, quotient)
    }

    /// Both operands are always evaluated; `&&` and `||` do not short-circuit.
    fn translate_logical(&mut self, op: LogicalOp, lhs: &Expr, rhs: &Expr) -> Result<Typed> {
        trace!(?op, "binary logical");
        let lhs = self.translate_expr(lhs)?;
        let rhs = self.translate_expr(rhs)?;

        if matches!(op, LogicalOp::And | LogicalOp::Or) {
            let a = self.to_bool(lhs);
            let b = self.to_bool(rhs);
            let value = if op == LogicalOp::And {
                self.builder.ins().band(a, b)
            } else {
                self.builder.ins().bor(a, b)
            };
            return Ok(Typed::new(value, Kind::Bool));
        }

        if lhs.kind == Kind::Float || rhs.kind == Kind::Float {
            let cc = match op {
                LogicalOp::Equal => FloatCC::Equal,
                LogicalOp::NotEqual => FloatCC::NotEqual,
                LogicalOp::LessThan => FloatCC::LessThan,
                LogicalOp::LessEqual => FloatCC::LessThanOrEqual,
                LogicalOp::GreaterThan => FloatCC::GreaterThan,
                _ => FloatCC::GreaterThanOrEqual,
            };
            let a = self.to_float(lhs);
            let b = self.to_float(rhs);
            return Ok(Typed::new(self.builder.ins().fcmp(cc, a, b), Kind::Bool));
        }

        let cc = match op {
            LogicalOp::Equal => IntCC::Equal,
            LogicalOp::NotEqual => IntCC::NotEqual,
            LogicalOp::LessThan => IntCC::SignedLessThan,
            LogicalOp::LessEqual => IntCC::SignedLessThanOrEqual,
            LogicalOp::GreaterThan => IntCC::SignedGreaterThan,
            _ => IntCC::SignedGreaterThanOrEqual,
        };
        let a = self.to_int(lhs);
        let b = self.to_int(rhs);
        Ok(Typed::new(self.builder.ins().icmp(cc, a, b), Kind::Bool))
    }
}
