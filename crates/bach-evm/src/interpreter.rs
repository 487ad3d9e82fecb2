//! EVM bytecode interpreter
//!
//! One [`Interpreter`] runs one frame. Each step looks the opcode up in the
//! hardfork's instruction table, checks stack bounds, charges static gas
//! and dispatches. Everything outside the frame goes through [`Host`].
//!
//! CALL and CREATE do not nest interpreters. The frame stops with an
//! [`InterpreterAction`] naming the child it wants, and the frame driver
//! hands the child's outcome back through [`Interpreter::resume`].

use crate::analysis::JumpDests;
use crate::config::Hardfork;
use crate::context::FrameContext;
use crate::error::{EvmError, EvmResult};
use crate::gas::{self, cost, Gas};
use crate::host::{CallInputs, CallScheme, CallValue, CreateInputs, CreateScheme, Host};
use crate::memory::Memory;
use crate::opcode::Opcode;
use crate::result::{ExitReason, FrameResult};
use crate::stack::{Stack, STACK_LIMIT};
use crate::table::InstructionTable;
use crate::word;
use bach_crypto::keccak256;
use bach_primitives::{Address, H256, U256};
use bach_state::Log;
use bytes::Bytes;
use std::sync::Arc;

/// Outcome of running a frame's code
#[derive(Clone, Debug)]
pub struct InterpreterResult {
    /// Exit status
    pub exit: ExitReason,
    /// Return or revert data
    pub output: Bytes,
    /// Gas meter at exit
    pub gas: Gas,
}

/// Why [`Interpreter::run`] stopped
#[derive(Debug)]
pub enum InterpreterAction {
    /// Run this call frame, then resume
    Call(Box<CallInputs>),
    /// Run this create frame, then resume
    Create(Box<CreateInputs>),
    /// The frame is finished
    Return(InterpreterResult),
}

enum Step {
    Continue,
    Exit(ExitReason, Bytes),
    Call(Box<CallInputs>),
    Create(Box<CreateInputs>),
}

/// Child frame the interpreter is suspended on
#[derive(Clone, Copy, Debug)]
enum Pending {
    Call { out_offset: usize, out_len: usize },
    Create,
}

/// Interpreter state for one frame
#[derive(Debug)]
pub struct Interpreter {
    /// Bytecode being executed
    code: Bytes,
    /// Valid jump destinations
    jumpdests: Arc<JumpDests>,
    /// Program counter
    pc: usize,
    /// Stack
    stack: Stack,
    /// Memory
    memory: Memory,
    /// Gas meter
    gas: Gas,
    /// Return data from the last call or create
    return_data: Bytes,
    /// Frame context
    context: FrameContext,
    /// Child frame this one is waiting on
    pending: Option<Pending>,
    /// Outcome of that child, applied on the next `run`
    child_result: Option<FrameResult>,
    table: &'static InstructionTable,
    hardfork: Hardfork,
}

impl Interpreter {
    /// Prepare a frame for `code`
    pub fn new(
        code: Bytes,
        jumpdests: Arc<JumpDests>,
        context: FrameContext,
        gas_limit: u64,
        hardfork: Hardfork,
    ) -> Self {
        Self {
            code,
            jumpdests,
            pc: 0,
            stack: Stack::new(),
            memory: Memory::new(),
            gas: Gas::new(gas_limit),
            return_data: Bytes::new(),
            context,
            pending: None,
            child_result: None,
            table: hardfork.instruction_table(),
            hardfork,
        }
    }

    /// Execute until the frame ends or needs a child frame
    ///
    /// An exceptional halt consumes all remaining gas. REVERT keeps it.
    pub fn run<H: Host>(&mut self, host: &mut H) -> InterpreterAction {
        if let Some(result) = self.child_result.take() {
            if let Err(err) = self.apply_child_result(result) {
                return InterpreterAction::Return(self.halt(err));
            }
        }
        loop {
            match self.step(host) {
                Ok(Step::Continue) => {}
                Ok(Step::Call(inputs)) => return InterpreterAction::Call(inputs),
                Ok(Step::Create(inputs)) => return InterpreterAction::Create(inputs),
                Ok(Step::Exit(exit, output)) => {
                    return InterpreterAction::Return(InterpreterResult {
                        exit,
                        output,
                        gas: self.gas,
                    });
                }
                Err(err) => return InterpreterAction::Return(self.halt(err)),
            }
        }
    }

    /// Hand back the outcome of the child requested by the last [`run`](Self::run)
    pub fn resume(&mut self, result: FrameResult) {
        self.child_result = Some(result);
    }

    /// Program counter
    pub fn pc(&self) -> usize {
        self.pc
    }

    /// Stack
    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    /// Memory
    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Gas meter
    pub fn gas(&self) -> &Gas {
        &self.gas
    }

    fn halt(&mut self, err: EvmError) -> InterpreterResult {
        tracing::trace!(pc = self.pc, depth = self.context.depth, error = %err, "frame halted");
        self.gas.spend_all();
        InterpreterResult {
            exit: ExitReason::Halt(err),
            output: Bytes::new(),
            gas: self.gas,
        }
    }

    fn apply_child_result(&mut self, result: FrameResult) -> EvmResult<()> {
        let Some(pending) = self.pending.take() else {
            return Ok(());
        };
        self.gas.erase_cost(result.gas.remaining());
        match pending {
            Pending::Call {
                out_offset,
                out_len,
            } => {
                let success = result.is_success();
                if success {
                    self.gas.record_refund(result.gas.refunded());
                }
                let copied = out_len.min(result.output.len());
                if copied > 0 {
                    self.memory.store(out_offset, &result.output[..copied]);
                }
                self.return_data = result.output;
                self.stack.push(word::from_bool(success))
            }
            Pending::Create => match result.created_address {
                Some(address) if result.is_success() => {
                    self.gas.record_refund(result.gas.refunded());
                    self.return_data = Bytes::new();
                    self.stack.push(address.to_word())
                }
                _ => {
                    self.return_data = if result.exit.is_revert() {
                        result.output
                    } else {
                        Bytes::new()
                    };
                    self.stack.push(U256::zero())
                }
            },
        }
    }

    fn step<H: Host>(&mut self, host: &mut H) -> EvmResult<Step> {
        let Some(&byte) = self.code.get(self.pc) else {
            return Ok(Step::Exit(ExitReason::Stop, Bytes::new()));
        };
        let info = self.table[byte as usize].ok_or(EvmError::InvalidOpcode(byte))?;

        let len = self.stack.len();
        let inputs = info.inputs as usize;
        if len < inputs {
            return Err(EvmError::StackUnderflow);
        }
        if len - inputs + info.outputs as usize > STACK_LIMIT {
            return Err(EvmError::StackOverflow);
        }
        self.gas.charge(info.static_gas)?;

        tracing::trace!(
            pc = self.pc,
            op = info.opcode.name(),
            gas = self.gas.remaining(),
            stack = len,
            depth = self.context.depth,
            "step"
        );

        let pc = self.pc;
        self.pc += 1;
        self.execute(info.opcode, pc, host)
    }

    /// Charge for and grow memory to cover `offset..offset + len`
    ///
    /// Returns the range as native integers. A zero length touches nothing
    /// and accepts any offset.
    fn resize_memory(&mut self, offset: U256, len: U256) -> EvmResult<(usize, usize)> {
        if len.is_zero() {
            return Ok((0, 0));
        }
        let offset = word::as_usize(offset)?;
        let len = word::as_usize(len)?;
        let end = offset.checked_add(len).ok_or(EvmError::OutOfGas)?;
        let current = self.memory.words() as u64;
        let new_words = end.div_ceil(32) as u64;
        if new_words > current {
            self.gas.charge(gas::memory_expansion_cost(current, new_words))?;
            self.memory.resize(offset, len);
        }
        Ok((offset, len))
    }

    fn require_non_static(&self) -> EvmResult<()> {
        if self.context.is_static {
            return Err(EvmError::StaticCallViolation);
        }
        Ok(())
    }

    fn binary(&mut self, f: impl FnOnce(U256, U256) -> U256) -> EvmResult<Step> {
        let [a, b] = self.stack.pop_n::<2>()?;
        self.stack.push(f(a, b))?;
        Ok(Step::Continue)
    }

    fn push(&mut self, value: U256) -> EvmResult<Step> {
        self.stack.push(value)?;
        Ok(Step::Continue)
    }

    fn cold_account_surcharge(&mut self, is_cold: bool) -> EvmResult<()> {
        if is_cold {
            self.gas.charge(cost::COLD_ACCOUNT_ACCESS - cost::WARM_ACCESS)?;
        }
        Ok(())
    }

    /// Execute an opcode
    fn execute<H: Host>(&mut self, opcode: Opcode, pc: usize, host: &mut H) -> EvmResult<Step> {
        use Opcode::*;
        match opcode {
            STOP => Ok(Step::Exit(ExitReason::Stop, Bytes::new())),

            // Arithmetic
            ADD => self.binary(word::add),
            MUL => self.binary(word::mul),
            SUB => self.binary(word::sub),
            DIV => self.binary(word::div),
            SDIV => self.binary(word::sdiv),
            MOD => self.binary(word::rem),
            SMOD => self.binary(word::smod),
            ADDMOD => {
                let [a, b, n] = self.stack.pop_n::<3>()?;
                self.push(word::addmod(a, b, n))
            }
            MULMOD => {
                let [a, b, n] = self.stack.pop_n::<3>()?;
                self.push(word::mulmod(a, b, n))
            }
            EXP => {
                let [base, exponent] = self.stack.pop_n::<2>()?;
                self.gas.charge(gas::exp_cost(exponent))?;
                self.push(word::exp(base, exponent))
            }
            SIGNEXTEND => self.binary(word::signextend),

            // Comparison and bitwise
            LT => self.binary(|a, b| word::from_bool(a < b)),
            GT => self.binary(|a, b| word::from_bool(a > b)),
            SLT => self.binary(|a, b| word::from_bool(word::slt(a, b))),
            SGT => self.binary(|a, b| word::from_bool(word::sgt(a, b))),
            EQ => self.binary(|a, b| word::from_bool(a == b)),
            ISZERO => {
                let a = self.stack.pop()?;
                self.push(word::from_bool(a.is_zero()))
            }
            AND => self.binary(|a, b| a & b),
            OR => self.binary(|a, b| a | b),
            XOR => self.binary(|a, b| a ^ b),
            NOT => {
                let a = self.stack.pop()?;
                self.push(!a)
            }
            BYTE => self.binary(word::byte),
            SHL => self.binary(word::shl),
            SHR => self.binary(word::shr),
            SAR => self.binary(word::sar),

            KECCAK256 => {
                let [offset, len] = self.stack.pop_n::<2>()?;
                let (offset, len) = self.resize_memory(offset, len)?;
                self.gas.charge(gas::keccak256_cost(len as u64))?;
                let hash = keccak256(self.memory.slice(offset, len));
                self.push(hash.to_word())
            }

            // Environment
            ADDRESS => self.push(self.context.address.to_word()),
            BALANCE => {
                let address = Address::from_word(self.stack.pop()?);
                let load = host.balance(address)?;
                self.cold_account_surcharge(load.is_cold)?;
                self.push(load.data)
            }
            ORIGIN => self.push(host.env().tx.origin.to_word()),
            CALLER => self.push(self.context.caller.to_word()),
            CALLVALUE => self.push(self.context.value),
            CALLDATALOAD => {
                let offset = word::as_usize_saturated(self.stack.pop()?);
                let mut buf = [0u8; 32];
                let input = &self.context.input;
                if offset < input.len() {
                    let n = (input.len() - offset).min(32);
                    buf[..n].copy_from_slice(&input[offset..offset + n]);
                }
                self.push(U256::from_big_endian(&buf))
            }
            CALLDATASIZE => self.push(U256::from(self.context.input.len())),
            CALLDATACOPY => {
                let [mem_offset, data_offset, len] = self.stack.pop_n::<3>()?;
                let (mem_offset, len) = self.resize_memory(mem_offset, len)?;
                self.gas.charge(gas::copy_cost(len as u64))?;
                let data_offset = word::as_usize_saturated(data_offset);
                self.memory
                    .store_padded(mem_offset, len, &self.context.input, data_offset);
                Ok(Step::Continue)
            }
            CODESIZE => self.push(U256::from(self.code.len())),
            CODECOPY => {
                let [mem_offset, code_offset, len] = self.stack.pop_n::<3>()?;
                let (mem_offset, len) = self.resize_memory(mem_offset, len)?;
                self.gas.charge(gas::copy_cost(len as u64))?;
                let code_offset = word::as_usize_saturated(code_offset);
                self.memory.store_padded(mem_offset, len, &self.code, code_offset);
                Ok(Step::Continue)
            }
            GASPRICE => self.push(host.env().tx.gas_price),
            EXTCODESIZE => {
                let address = Address::from_word(self.stack.pop()?);
                let load = host.code(address)?;
                self.cold_account_surcharge(load.is_cold)?;
                self.push(U256::from(load.data.len()))
            }
            EXTCODECOPY => {
                let address = Address::from_word(self.stack.pop()?);
                let [mem_offset, code_offset, len] = self.stack.pop_n::<3>()?;
                let load = host.code(address)?;
                self.cold_account_surcharge(load.is_cold)?;
                let (mem_offset, len) = self.resize_memory(mem_offset, len)?;
                self.gas.charge(gas::copy_cost(len as u64))?;
                let code_offset = word::as_usize_saturated(code_offset);
                self.memory.store_padded(mem_offset, len, &load.data, code_offset);
                Ok(Step::Continue)
            }
            RETURNDATASIZE => self.push(U256::from(self.return_data.len())),
            RETURNDATACOPY => {
                let [mem_offset, data_offset, len] = self.stack.pop_n::<3>()?;
                let end = data_offset
                    .checked_add(len)
                    .ok_or(EvmError::ReturnDataOutOfBounds)?;
                if end > U256::from(self.return_data.len()) {
                    return Err(EvmError::ReturnDataOutOfBounds);
                }
                let (mem_offset, len) = self.resize_memory(mem_offset, len)?;
                self.gas.charge(gas::copy_cost(len as u64))?;
                let data_offset = word::as_usize_saturated(data_offset);
                self.memory
                    .store_padded(mem_offset, len, &self.return_data, data_offset);
                Ok(Step::Continue)
            }
            EXTCODEHASH => {
                let address = Address::from_word(self.stack.pop()?);
                let load = host.code_hash(address)?;
                self.cold_account_surcharge(load.is_cold)?;
                self.push(load.data.to_word())
            }

            // Block
            BLOCKHASH => {
                let number = self.stack.pop()?;
                let hash = host.block_hash(number)?;
                self.push(hash.to_word())
            }
            COINBASE => self.push(host.env().block.coinbase.to_word()),
            TIMESTAMP => self.push(U256::from(host.env().block.timestamp)),
            NUMBER => self.push(U256::from(host.env().block.number)),
            PREVRANDAO => self.push(host.env().block.prevrandao_word()),
            GASLIMIT => self.push(U256::from(host.env().block.gas_limit)),
            CHAINID => self.push(U256::from(host.env().block.chain_id)),
            SELFBALANCE => {
                let load = host.balance(self.context.address)?;
                self.push(load.data)
            }
            BASEFEE => self.push(host.env().block.base_fee),
            BLOBHASH => {
                let index = self.stack.pop()?;
                let hashes = &host.env().tx.blob_hashes;
                let hash = if index < U256::from(hashes.len()) {
                    hashes[index.low_u64() as usize]
                } else {
                    H256::ZERO
                };
                self.push(hash.to_word())
            }
            BLOBBASEFEE => self.push(host.env().block.blob_base_fee),

            // Stack, memory, storage and flow
            POP => {
                self.stack.pop()?;
                Ok(Step::Continue)
            }
            MLOAD => {
                let offset = self.stack.pop()?;
                let (offset, _) = self.resize_memory(offset, U256::from(32))?;
                self.push(self.memory.load_word(offset))
            }
            MSTORE => {
                let [offset, value] = self.stack.pop_n::<2>()?;
                let (offset, _) = self.resize_memory(offset, U256::from(32))?;
                self.memory.store_word(offset, value);
                Ok(Step::Continue)
            }
            MSTORE8 => {
                let [offset, value] = self.stack.pop_n::<2>()?;
                let (offset, _) = self.resize_memory(offset, U256::one())?;
                self.memory.store8(offset, value.low_u32() as u8);
                Ok(Step::Continue)
            }
            SLOAD => {
                let key = self.stack.pop()?;
                let load = host.sload(self.context.address, key)?;
                if load.is_cold {
                    self.gas.charge(cost::COLD_SLOAD - cost::WARM_ACCESS)?;
                }
                self.push(load.data)
            }
            SSTORE => {
                self.require_non_static()?;
                if self.gas.remaining() <= cost::SSTORE_SENTRY {
                    return Err(EvmError::OutOfGas);
                }
                let [key, value] = self.stack.pop_n::<2>()?;
                let slot = host.sstore(self.context.address, key, value)?;
                self.gas.charge(gas::sstore_cost(
                    slot.original,
                    slot.present,
                    slot.new,
                    slot.is_cold,
                ))?;
                self.gas.record_refund(gas::sstore_refund(
                    self.hardfork,
                    slot.original,
                    slot.present,
                    slot.new,
                ));
                Ok(Step::Continue)
            }
            JUMP => {
                let dest = self.stack.pop()?;
                self.jump(dest)?;
                Ok(Step::Continue)
            }
            JUMPI => {
                let [dest, condition] = self.stack.pop_n::<2>()?;
                if !condition.is_zero() {
                    self.jump(dest)?;
                }
                Ok(Step::Continue)
            }
            PC => self.push(U256::from(pc)),
            MSIZE => self.push(U256::from(self.memory.size())),
            GAS => self.push(U256::from(self.gas.remaining())),
            JUMPDEST => Ok(Step::Continue),
            TLOAD => {
                let key = self.stack.pop()?;
                self.push(host.tload(self.context.address, key))
            }
            TSTORE => {
                self.require_non_static()?;
                let [key, value] = self.stack.pop_n::<2>()?;
                host.tstore(self.context.address, key, value);
                Ok(Step::Continue)
            }
            MCOPY => {
                let [dest, src, len] = self.stack.pop_n::<3>()?;
                if len.is_zero() {
                    return Ok(Step::Continue);
                }
                let (dest, len) = self.resize_memory(dest, len)?;
                let (src, _) = self.resize_memory(src, U256::from(len))?;
                self.gas.charge(gas::copy_cost(len as u64))?;
                self.memory.copy_within(dest, src, len);
                Ok(Step::Continue)
            }
            PUSH0 => self.push(U256::zero()),

            // System
            CREATE => self.create(host, false),
            CREATE2 => self.create(host, true),
            CALL => self.call(host, CallScheme::Call),
            CALLCODE => self.call(host, CallScheme::CallCode),
            DELEGATECALL => self.call(host, CallScheme::DelegateCall),
            STATICCALL => self.call(host, CallScheme::StaticCall),
            RETURN | REVERT => {
                let [offset, len] = self.stack.pop_n::<2>()?;
                let (offset, len) = self.resize_memory(offset, len)?;
                let output = Bytes::copy_from_slice(self.memory.slice(offset, len));
                let exit = if opcode == RETURN {
                    ExitReason::Return
                } else {
                    ExitReason::Revert
                };
                Ok(Step::Exit(exit, output))
            }
            INVALID => Err(EvmError::InvalidOpcode(INVALID.as_u8())),
            SELFDESTRUCT => self.selfdestruct(host),

            op if op.is_push() => {
                let n = op.push_size();
                let mut buf = [0u8; 32];
                let start = self.pc.min(self.code.len());
                let end = (self.pc + n).min(self.code.len());
                // Bytes past the end of code read as zero
                buf[32 - n..32 - n + (end - start)].copy_from_slice(&self.code[start..end]);
                self.pc += n;
                self.push(U256::from_big_endian(&buf))
            }
            op => {
                let byte = op.as_u8();
                match byte {
                    0x80..=0x8F => {
                        self.stack.dup((byte - 0x7F) as usize)?;
                        Ok(Step::Continue)
                    }
                    0x90..=0x9F => {
                        self.stack.swap((byte - 0x8F) as usize)?;
                        Ok(Step::Continue)
                    }
                    0xA0..=0xA4 => self.log(host, (byte - 0xA0) as usize),
                    _ => Err(EvmError::InvalidOpcode(byte)),
                }
            }
        }
    }

    fn jump(&mut self, dest: U256) -> EvmResult<()> {
        let target = word::as_usize_saturated(dest);
        if !self.jumpdests.is_valid(target) {
            return Err(EvmError::InvalidJump(target));
        }
        self.pc = target;
        Ok(())
    }

    fn log<H: Host>(&mut self, host: &mut H, topic_count: usize) -> EvmResult<Step> {
        self.require_non_static()?;
        let [offset, len] = self.stack.pop_n::<2>()?;
        let mut topics = Vec::with_capacity(topic_count);
        for _ in 0..topic_count {
            topics.push(H256::from_word(self.stack.pop()?));
        }
        let (offset, len) = self.resize_memory(offset, len)?;
        self.gas.charge(gas::log_data_cost(len as u64))?;
        host.log(Log {
            address: self.context.address,
            topics,
            data: Bytes::copy_from_slice(self.memory.slice(offset, len)),
        });
        Ok(Step::Continue)
    }

    #[inline(never)]
    fn call<H: Host>(&mut self, host: &mut H, scheme: CallScheme) -> EvmResult<Step> {
        let requested = self.stack.pop()?;
        let to = Address::from_word(self.stack.pop()?);
        let value = match scheme {
            CallScheme::Call | CallScheme::CallCode => self.stack.pop()?,
            CallScheme::DelegateCall | CallScheme::StaticCall => U256::zero(),
        };
        let [in_offset, in_len, out_offset, out_len] = self.stack.pop_n::<4>()?;

        let transfers_value = !value.is_zero();
        if scheme == CallScheme::Call && transfers_value {
            self.require_non_static()?;
        }

        let (in_offset, in_len) = self.resize_memory(in_offset, in_len)?;
        let (out_offset, out_len) = self.resize_memory(out_offset, out_len)?;

        let account = host.load_account(to)?;
        self.cold_account_surcharge(account.is_cold)?;
        if transfers_value {
            self.gas.charge(cost::CALL_VALUE)?;
            if scheme == CallScheme::Call && account.is_empty {
                self.gas.charge(cost::NEW_ACCOUNT)?;
            }
        }

        let mut gas_limit =
            word::as_u64_saturated(requested).min(gas::all_but_one_64th(self.gas.remaining()));
        self.gas.charge(gas_limit)?;
        if transfers_value {
            gas_limit += cost::CALL_STIPEND;
        }

        let input = Bytes::copy_from_slice(self.memory.slice(in_offset, in_len));
        let ctx = &self.context;
        let (caller, target, call_value, is_static) = match scheme {
            CallScheme::Call => (ctx.address, to, CallValue::Transfer(value), ctx.is_static),
            CallScheme::CallCode => (
                ctx.address,
                ctx.address,
                CallValue::Transfer(value),
                ctx.is_static,
            ),
            CallScheme::DelegateCall => (
                ctx.caller,
                ctx.address,
                CallValue::Apparent(ctx.value),
                ctx.is_static,
            ),
            CallScheme::StaticCall => (ctx.address, to, CallValue::Transfer(U256::zero()), true),
        };
        let inputs = CallInputs {
            scheme,
            caller,
            target,
            code_address: to,
            value: call_value,
            input,
            gas_limit,
            is_static,
            depth: ctx.depth + 1,
        };
        self.pending = Some(Pending::Call {
            out_offset,
            out_len,
        });
        Ok(Step::Call(Box::new(inputs)))
    }

    #[inline(never)]
    fn create<H: Host>(&mut self, host: &mut H, is_create2: bool) -> EvmResult<Step> {
        self.require_non_static()?;
        let [value, offset, len] = self.stack.pop_n::<3>()?;
        let scheme = if is_create2 {
            CreateScheme::Create2 {
                salt: self.stack.pop()?,
            }
        } else {
            CreateScheme::Create
        };

        let (offset, len) = self.resize_memory(offset, len)?;
        if self.hardfork.is_enabled_in(Hardfork::Shanghai) && len > host.config().max_initcode_size
        {
            return Err(EvmError::MaxInitCodeSizeExceeded);
        }
        self.gas
            .charge(gas::create_cost(self.hardfork, len as u64, is_create2))?;

        let init_code = Bytes::copy_from_slice(self.memory.slice(offset, len));
        let gas_limit = gas::all_but_one_64th(self.gas.remaining());
        self.gas.charge(gas_limit)?;

        self.pending = Some(Pending::Create);
        Ok(Step::Create(Box::new(CreateInputs {
            caller: self.context.address,
            scheme,
            value,
            init_code,
            gas_limit,
            depth: self.context.depth + 1,
        })))
    }

    #[inline(never)]
    fn selfdestruct<H: Host>(&mut self, host: &mut H) -> EvmResult<Step> {
        self.require_non_static()?;
        let target = Address::from_word(self.stack.pop()?);
        let outcome = host.selfdestruct(self.context.address, target)?;
        if outcome.is_cold {
            self.gas.charge(cost::COLD_ACCOUNT_ACCESS)?;
        }
        if outcome.had_value && !outcome.target_exists {
            self.gas.charge(cost::NEW_ACCOUNT)?;
        }
        if !self.hardfork.is_enabled_in(Hardfork::London) && !outcome.previously_destroyed {
            self.gas.record_refund(cost::SELFDESTRUCT_REFUND);
        }
        Ok(Step::Exit(ExitReason::SelfDestruct, Bytes::new()))
    }
}
