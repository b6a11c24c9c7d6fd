use std::collections::HashMap;
use std::fmt;

use cranelift_codegen::ir::{types, AbiParam, InstBuilder, StackSlotData, StackSlotKind, Type};
use cranelift_codegen::Context;
use cranelift_frontend::{FunctionBuilder, FunctionBuilderContext};
use cranelift_jit::JITModule;
use cranelift_module::{DataDescription, FuncId, Linkage, Module};
use tracing::debug;

use crate::engine::{new_jit_module, OptLevel, Program, MOD_SYMBOL};
use crate::error::{CodegenError, EngineError};
use crate::parser::{CompUnit, Decl, FuncDecl, ScalarType, VarDecl};

use super::{constant, FunctionTranslator, Location, Storage, SymbolTable};

#[derive(Clone, Debug)]
pub struct Options {
    /// Name of the function the engine calls.
    pub entry: String,
    pub opt_level: OptLevel,
    /// Keep the textual IR of each function on the resulting [`Program`].
    pub capture_ir: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            entry: "main".to_string(),
            opt_level: OptLevel::default(),
            capture_ir: false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct FunctionInfo {
    pub id: FuncId,
    pub params: Vec<ScalarType>,
    pub return_type: ScalarType,
}

pub(super) fn module_error(err: impl fmt::Display) -> CodegenError {
    CodegenError::Module(err.to_string())
}

/// IR type of a non-void scalar.
pub(super) fn ir_type(ty: ScalarType) -> Type {
    match ty {
        ScalarType::Float64 => types::F64,
        ScalarType::Int64 | ScalarType::Void => types::I64,
    }
}

pub(super) fn slot_data() -> StackSlotData {
    StackSlotData::new(StackSlotKind::ExplicitSlot, 8, 3)
}

pub struct Codegen {
    module: JITModule,
    ctx: Context,
    builder_ctx: FunctionBuilderContext,
    symbol_table: SymbolTable,
    functions: HashMap<String, FunctionInfo>,
    mod_func: Option<FuncId>,
    options: Options,
    entry: Option<(FuncId, ScalarType)>,
    ir: Vec<String>,
}

impl Codegen {
    pub fn new(options: Options) -> Result<Self, EngineError> {
        let module = new_jit_module(options.opt_level)?;
        let ctx = module.make_context();
        Ok(Self {
            module,
            ctx,
            builder_ctx: FunctionBuilderContext::new(),
            symbol_table: SymbolTable::new(),
            functions: HashMap::new(),
            mod_func: None,
            options,
            entry: None,
            ir: vec![],
        })
    }

    /// Generates every declaration in source order. The first error aborts
    /// generation and no program is produced.
    pub fn generate(mut self, comp_unit: &CompUnit) -> Result<Program, CodegenError> {
        if let Err(e) = self.gen_comp_unit(comp_unit) {
            // SAFETY: no pointer into the module's memory has been handed out.
            unsafe { self.module.free_memory() };
            return Err(e);
        }
        Ok(Program::new(
            self.module,
            self.options.entry,
            self.entry,
            self.ir,
        ))
    }

    fn gen_comp_unit(&mut self, comp_unit: &CompUnit) -> Result<(), CodegenError> {
        for decl in &comp_unit.0 {
            match decl {
                Decl::Var(var) => self.gen_global(var)?,
                Decl::Func(func) => self.gen_func(func)?,
            }
        }
        Ok(())
    }

    /// Rejects names that clash with an earlier definition or a runtime symbol.
    fn check_new_name(&self, name: &str) -> Result<(), CodegenError> {
        if name == MOD_SYMBOL {
            return Err(CodegenError::ReservedName(name.to_string()));
        }
        if self.functions.contains_key(name) || self.symbol_table.resolve(name).is_ok() {
            return Err(CodegenError::DuplicateDefinition(name.to_string()));
        }
        Ok(())
    }

    fn gen_global(&mut self, decl: &VarDecl) -> Result<(), CodegenError> {
        if decl.ty == ScalarType::Void {
            return Err(CodegenError::InvalidType {
                name: decl.name.clone(),
                ty: decl.ty.to_string(),
            });
        }
        self.check_new_name(&decl.name)?;

        let bytes = match &decl.init {
            None => [0; 8],
            Some(init) => constant::fold(init)
                .ok_or_else(|| CodegenError::UnsupportedGlobalInitializer(decl.name.clone()))?
                .to_bytes(decl.ty),
        };

        let data_id = self
            .module
            .declare_data(&decl.name, Linkage::Local, true, false)
            .map_err(module_error)?;
        let mut data = DataDescription::new();
        data.define(Box::new(bytes));
        data.set_align(8);
        self.module
            .define_data(data_id, &data)
            .map_err(module_error)?;

        self.symbol_table.declare_global(
            &decl.name,
            Storage {
                location: Location::Global(data_id),
                ty: decl.ty,
                is_const: decl.is_const,
            },
        )?;
        debug!(name = %decl.name, ty = %decl.ty, "generated global");
        Ok(())
    }

    fn declare_func(&mut self, func: &FuncDecl) -> Result<FunctionInfo, CodegenError> {
        let is_entry = func.name == self.options.entry;
        if is_entry {
            if self.entry.is_some() {
                return Err(CodegenError::DuplicateEntryPoint(func.name.clone()));
            }
            if !func.params.is_empty() {
                return Err(CodegenError::InvalidEntryPoint(func.name.clone()));
            }
        }

        self.check_new_name(&func.name)?;
        if let Some(param) = func.params.iter().find(|p| p.ty == ScalarType::Void) {
            return Err(CodegenError::InvalidType {
                name: param.name.clone(),
                ty: param.ty.to_string(),
            });
        }

        let mut sig = self.module.make_signature();
        for param in &func.params {
            sig.params.push(AbiParam::new(ir_type(param.ty)));
        }
        if func.return_type != ScalarType::Void {
            sig.returns.push(AbiParam::new(ir_type(func.return_type)));
        }

        let linkage = if is_entry {
            Linkage::Export
        } else {
            Linkage::Local
        };
        let id = self
            .module
            .declare_function(&func.name, linkage, &sig)
            .map_err(module_error)?;
        self.ctx.func.signature = sig;

        if is_entry {
            self.entry = Some((id, func.return_type));
        }
        let info = FunctionInfo {
            id,
            params: func.params.iter().map(|p| p.ty).collect(),
            return_type: func.return_type,
        };
        self.functions.insert(func.name.clone(), info.clone());
        Ok(info)
    }

    fn gen_func(&mut self, func: &FuncDecl) -> Result<(), CodegenError> {
        if func.return_type != ScalarType::Void && !func.body.records_return_value() {
            return Err(CodegenError::MissingReturnValue(func.name.clone()));
        }
        let info = self.declare_func(func)?;

        self.symbol_table.enter_function();
        let mut builder = FunctionBuilder::new(&mut self.ctx.func, &mut self.builder_ctx);

        let entry_block = builder.create_block();
        builder.append_block_params_for_function_params(entry_block);
        builder.switch_to_block(entry_block);

        for (param, value) in func
            .params
            .iter()
            .zip(builder.block_params(entry_block).to_vec())
        {
            let slot = builder.create_sized_stack_slot(slot_data());
            builder.ins().stack_store(value, slot, 0);
            self.symbol_table.declare_local(
                &param.name,
                Storage {
                    location: Location::Local(slot),
                    ty: param.ty,
                    is_const: false,
                },
            )?;
        }

        let return_slot = if func.return_type == ScalarType::Void {
            None
        } else {
            let slot = builder.create_sized_stack_slot(slot_data());
            let zero = match func.return_type {
                ScalarType::Float64 => builder.ins().f64const(0.0),
                _ => builder.ins().iconst(types::I64, 0),
            };
            builder.ins().stack_store(zero, slot, 0);
            Some(slot)
        };

        let mut translator = FunctionTranslator::new(
            builder,
            &mut self.module,
            &mut self.symbol_table,
            &self.functions,
            &mut self.mod_func,
            func.return_type,
            return_slot,
        );
        translator.translate_block(&func.body)?;
        translator.finish();
        self.symbol_table.leave_function();

        if self.options.capture_ir {
            self.ir.push(self.ctx.func.display().to_string());
        }
        self.module
            .define_function(info.id, &mut self.ctx)
            .map_err(module_error)?;
        self.module.clear_context(&mut self.ctx);

        debug!(name = %func.name, params = func.params.len(), "generated function");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn generate(s: &str, options: Options) -> Result<Program, CodegenError> {
        let unit = Parser::new(Lexer::tokenize(s).unwrap()).parse().unwrap();
        Codegen::new(options).unwrap().generate(&unit)
    }

    #[test]
    fn captures_ir_per_function() {
        let options = Options {
            capture_ir: true,
            ..Options::default()
        };
        let program = generate("int f(int a) { return a; } int main() { return f(2); }", options)
            .unwrap();
        assert_eq!(program.ir().len(), 2);
        assert!(program.ir()[1].contains("call"));
    }

    #[test]
    fn entry_point_checks() {
        assert_eq!(
            generate("int main() { return 0; } int main() { return 1; }", Options::default())
                .err(),
            Some(CodegenError::DuplicateEntryPoint("main".to_string()))
        );
        assert_eq!(
            generate("int main(int a) { return a; }", Options::default()).err(),
            Some(CodegenError::InvalidEntryPoint("main".to_string()))
        );
        let options = Options {
            entry: "start".to_string(),
            ..Options::default()
        };
        assert!(!generate("int main() { return 0; }", options).unwrap().has_entry());
    }

    #[test]
    fn definition_errors() {
        assert_eq!(
            generate("int f() { return 0; } int f() { return 1; }", Options::default()).err(),
            Some(CodegenError::DuplicateDefinition("f".to_string()))
        );
        assert_eq!(
            generate("int g; float g;", Options::default()).err(),
            Some(CodegenError::DuplicateDefinition("g".to_string()))
        );
        assert_eq!(
            generate("void v; int main() { return 0; }", Options::default()).err(),
            Some(CodegenError::InvalidType {
                name: "v".to_string(),
                ty: "void".to_string(),
            })
        );
        assert_eq!(
            generate("int f(void a) { return 0; }", Options::default()).err(),
            Some(CodegenError::InvalidType {
                name: "a".to_string(),
                ty: "void".to_string(),
            })
        );
    }
}
