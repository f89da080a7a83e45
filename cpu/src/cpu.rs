// SPDX-License-Identifier: MPL-2.0

//! The fetch/decode/execute loop.

use std::fmt;

use crate::{
    instr::{Kind, OpTable, Word, OP_TABLE},
    reg::{self, GPR_COUNT},
    Config,
    Error,
    Program,
};

/// Where a [`Cpu`] is in its lifecycle.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Status {
    /// No program is bound.
    Idle,
    /// A program is bound and the registers are in the reset state.
    Loaded,
    /// At least one step has executed and the next fetch is still within the program.
    Running,
    /// The next fetch lies outside the program.
    Halted,
}

/// What happened during one step, as reported to a [`Cpu`] hook.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Trace {
    /// The index of the fetched word.
    pub index: usize,
    pub word: Word,
    /// The dispatch key derived from `word`.
    pub key: u16,
    /// The operation that ran, or `None` if the key is unmapped and the word was skipped.
    pub kind: Option<Kind>,
    /// *PC* after the step.
    pub pc: u32,
    /// *nPC* after the step.
    pub npc: u32,
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}  {:08x}   ", self.index, self.word.code())?;
        match self.kind {
            Some(kind) => write!(f, "{}", kind.asm(self.word)),
            None => write!(f, "(unknown key {:#x})", self.key),
        }
    }
}

type Hook = Box<dyn FnMut(&Trace) + Send>;

/// The execution engine.
///
/// A `Cpu` owns its register file exclusively and borrows its instruction stream from a shared
/// [`Program`].
pub struct Cpu {
    reg: reg::File,
    config: Config,
    table: &'static OpTable,
    program: Option<Program>,
    status: Status,
    steps: u64,
    hook: Option<Hook>,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl fmt::Debug for Cpu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cpu")
            .field("reg", &self.reg)
            .field("config", &self.config)
            .field("program_len", &self.program.as_ref().map(Program::len))
            .field("status", &self.status)
            .field("steps", &self.steps)
            .field("has_hook", &self.hook.is_some())
            .finish()
    }
}

impl Cpu {
    pub fn new(config: Config) -> Self {
        Self {
            reg: reg::File::new(config.hardwire_zero),
            config,
            table: &OP_TABLE,
            program: None,
            status: Status::Idle,
            steps: 0,
            hook: None,
        }
    }

    /// Installs a callback that observes every executed step.
    pub fn set_hook(&mut self, hook: impl FnMut(&Trace) + Send + 'static) {
        self.hook = Some(Box::new(hook));
    }

    pub fn clear_hook(&mut self) {
        self.hook = None;
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn program(&self) -> Option<&Program> {
        self.program.as_ref()
    }

    /// The register file, read-only. Writes go through [`Self::set_gpr`], which checks the index.
    pub fn reg(&self) -> &reg::File {
        &self.reg
    }

    /// The number of steps executed since the last reset.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn pc(&self) -> u32 {
        self.reg.pc()
    }

    pub fn npc(&self) -> u32 {
        self.reg.npc()
    }

    pub fn hi(&self) -> i32 {
        self.reg.hi() as i32
    }

    pub fn lo(&self) -> i32 {
        self.reg.lo() as i32
    }

    pub fn gpr(&self, index: usize) -> Result<i32, Error> {
        Ok(self.reg.gpr(check_gpr_index(index)?) as i32)
    }

    pub fn set_gpr(&mut self, index: usize, value: i32) -> Result<(), Error> {
        self.reg.set_gpr(check_gpr_index(index)?, value as u32);

        Ok(())
    }

    /// The index of the next word to fetch, i.e. `nPC / 4 - 1`.
    ///
    /// Returns `None` if *nPC* is below 4, which no program can satisfy.
    pub fn fetch_index(&self) -> Option<usize> {
        (self.reg.npc() / 4).checked_sub(1).map(|it| it as usize)
    }

    /// Binds `program`, replacing any previously bound one, and resets the registers so that the
    /// first step fetches word 0.
    ///
    /// An empty program leaves the engine [`Status::Halted`].
    pub fn load_program(&mut self, program: impl Into<Program>) {
        let program = program.into();
        tracing::info!("Loaded program of {} words", program.len());
        self.program = Some(program);
        self.reg.reset();
        self.steps = 0;
        self.status = Status::Loaded;
        if !self.can_fetch() {
            self.halt();
        }
    }

    /// Restores the registers to their initial state, keeping the bound program.
    pub fn reset(&mut self) {
        tracing::info!("Reset after {} steps", self.steps);
        self.reg.reset();
        self.steps = 0;
        self.status = match self.program {
            Some(_) => Status::Loaded,
            None => Status::Idle,
        };
        if self.program.is_some() && !self.can_fetch() {
            self.status = Status::Halted;
        }
    }

    /// Executes until the next fetch leaves the program, returning the number of steps taken.
    pub fn run_program(&mut self) -> Result<usize, Error> {
        self.step_program(usize::MAX)
    }

    /// Executes up to `count` steps, stopping early if the next fetch leaves the program.
    ///
    /// Returns the number of steps taken.
    pub fn step_program(&mut self, count: usize) -> Result<usize, Error> {
        if self.program.is_none() {
            return Err(Error::NoProgram);
        }

        let mut taken = 0;
        while taken < count && self.step() {
            taken += 1;
        }

        if self.can_fetch() {
            if taken > 0 {
                self.status = Status::Running;
            }
        } else {
            self.halt();
        }

        Ok(taken)
    }

    fn can_fetch(&self) -> bool {
        self.fetch().is_some()
    }

    fn fetch(&self) -> Option<(usize, u32)> {
        let index = self.fetch_index()?;
        let code = self.program.as_ref()?.get(index)?;

        Some((index, code))
    }

    fn halt(&mut self) {
        if self.status != Status::Halted {
            tracing::info!(
                "Halted after {} steps (pc={:#010x}, npc={:#010x})",
                self.steps,
                self.reg.pc(),
                self.reg.npc(),
            );
        }
        self.status = Status::Halted;
    }

    /// Fetches, decodes and executes one word. Returns `false` without doing anything if the next
    /// fetch lies outside the program.
    fn step(&mut self) -> bool {
        let Some((index, code)) = self.fetch() else {
            return false;
        };

        let word = Word::from(code);
        let key = word.key();
        let kind = self.table.lookup(key);

        match kind {
            Some(kind) => {
                tracing::trace!("{:04}  {:08x}   {}", index, code, kind.asm(word));
                match kind.execute(word, &mut self.reg, &self.config) {
                    Some(target) => {
                        tracing::trace!("Redirecting to {:#010x}", target);
                        self.reg.jump(target);
                    }
                    None => self.reg.advance(),
                }
            }
            None => {
                // Unknown words are skipped rather than faulting.
                tracing::debug!("Unknown internal opcode {:#x} at word {} ({:#010x})", key, index, code);
                self.reg.advance();
            }
        }
        self.steps += 1;

        if let Some(hook) = self.hook.as_mut() {
            hook(&Trace {
                index,
                word,
                key,
                kind,
                pc: self.reg.pc(),
                npc: self.reg.npc(),
            });
        }

        true
    }
}

fn check_gpr_index(index: usize) -> Result<u8, Error> {
    if index < GPR_COUNT {
        Ok(index as u8)
    } else {
        Err(Error::RegisterOutOfRange { index })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::MultMode;

    /// addi r4, r4, 12; addi r5, r5, 4; add r6, r5, r4
    const SUM: [u32; 3] = [0x2084_000c, 0x20a5_0004, 0x00a4_3020];

    /// Ten iterations of a Fibonacci loop: r1 and r2 hold consecutive terms, r3 counts down.
    const FIB: [u32; 8] = [
        0x2001_0000, // addi r1, r0, 0
        0x2002_0001, // addi r2, r0, 1
        0x2003_000a, // addi r3, r0, 10
        0x0022_2020, // add  r4, r1, r2
        0x0002_0820, // add  r1, r0, r2
        0x0004_1020, // add  r2, r0, r4
        0x2063_ffff, // addi r3, r3, -1
        0x1460_fffb, // bne  r3, r0, -5
    ];

    fn gprs(cpu: &Cpu, indices: &[usize]) -> Vec<i32> {
        indices.iter().map(|it| cpu.gpr(*it).unwrap()).collect()
    }

    fn loaded(words: impl Into<Program>) -> Cpu {
        let mut cpu = Cpu::default();
        cpu.load_program(words);
        cpu
    }

    fn record_kinds(cpu: &mut Cpu) -> Arc<Mutex<Vec<Option<Kind>>>> {
        let kinds = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&kinds);
        cpu.set_hook(move |trace| sink.lock().unwrap().push(trace.kind));

        kinds
    }

    #[test]
    fn runs_straight_line_sum() {
        let mut cpu = loaded(SUM);
        assert_eq!(cpu.status(), Status::Loaded);
        assert_eq!(cpu.run_program(), Ok(3));
        assert_eq!(gprs(&cpu, &[4, 5, 6]), vec![12, 4, 16]);
        assert_eq!((cpu.pc(), cpu.npc()), (12, 16));
        assert_eq!(cpu.status(), Status::Halted);
    }

    #[test]
    fn stepping_matches_intermediate_snapshot() {
        let mut cpu = loaded(FIB);
        assert_eq!(cpu.step_program(9), Ok(9));
        assert_eq!(cpu.status(), Status::Running);
        assert_eq!(gprs(&cpu, &[1, 2, 3, 4]), vec![1, 1, 9, 2]);
        assert_eq!((cpu.pc(), cpu.npc()), (16, 20));

        assert_eq!(cpu.run_program(), Ok(44));
        assert_eq!(gprs(&cpu, &[1, 2, 3, 4]), vec![55, 89, 0, 89]);
        assert_eq!((cpu.pc(), cpu.npc()), (32, 36));
        assert_eq!(cpu.steps(), 53);
    }

    #[test]
    fn stepping_then_running_equals_running() {
        let mut stepped = loaded(FIB);
        stepped.step_program(9).unwrap();
        stepped.run_program().unwrap();

        let mut ran = loaded(FIB);
        assert_eq!(ran.run_program(), Ok(53));
        assert_eq!(stepped.reg(), ran.reg());
    }

    #[test]
    fn step_program_stops_at_the_end() {
        let mut cpu = loaded(SUM);
        assert_eq!(cpu.step_program(10), Ok(3));
        assert_eq!(cpu.step_program(1), Ok(0));
        assert_eq!(cpu.run_program(), Ok(0));
        assert_eq!(cpu.status(), Status::Halted);
    }

    #[test]
    fn branch_taken_and_not_taken() {
        let taken = |words: [u32; 5]| {
            let mut cpu = loaded(words);
            let steps = cpu.run_program().unwrap();
            (steps, gprs(&cpu, &[3, 4]))
        };

        let body = |second: u32, branch: u32| {
            [0x2001_0005, second, branch, 0x2003_0001, 0x2004_0001]
        };
        const EQUAL: u32 = 0x2002_0005;
        const UNEQUAL: u32 = 0x2002_0006;
        // beq/bne r1, r2, 1
        const BEQ: u32 = 0x1022_0001;
        const BNE: u32 = 0x1422_0001;

        assert_eq!(taken(body(EQUAL, BEQ)), (4, vec![0, 1]));
        assert_eq!(taken(body(UNEQUAL, BEQ)), (5, vec![1, 1]));
        assert_eq!(taken(body(EQUAL, BNE)), (5, vec![1, 1]));
        assert_eq!(taken(body(UNEQUAL, BNE)), (4, vec![0, 1]));
    }

    #[test]
    fn branch_redirects_pc_pair() {
        let mut cpu = loaded([0x2001_0005, 0x2002_0005, 0x1022_0001, 0x2003_0001, 0x2004_0001]);
        cpu.step_program(3).unwrap();
        assert_eq!((cpu.pc(), cpu.npc()), (12, 20));
        assert_eq!(cpu.fetch_index(), Some(4));
    }

    #[test]
    fn calls_and_returns() {
        let mut cpu = loaded([
            0x2007_0001, // addi r7, r0, 1
            0x0c00_0004, // jal  0x10
            0x2005_0007, // addi r5, r0, 7
            0x0800_0006, // j    0x18
            0x2006_0009, // addi r6, r0, 9
            0x03e0_0008, // jr   r31
        ]);
        let kinds = record_kinds(&mut cpu);

        assert_eq!(cpu.run_program(), Ok(6));
        assert_eq!(gprs(&cpu, &[5, 6, 7, 31]), vec![7, 9, 1, 8]);
        assert_eq!((cpu.pc(), cpu.npc()), (16, 28));
        assert_eq!(
            *kinds.lock().unwrap(),
            [Kind::Addi, Kind::Jal, Kind::Addi, Kind::Jr, Kind::Addi, Kind::J].map(Some),
        );
    }

    #[test]
    fn jr_below_the_first_word_halts() {
        let mut cpu = loaded([0x0020_0008]); // jr r1
        cpu.set_gpr(1, -4).unwrap();
        assert_eq!(cpu.run_program(), Ok(1));
        assert_eq!(cpu.npc(), 0);
        assert_eq!(cpu.fetch_index(), None);
        assert_eq!(cpu.status(), Status::Halted);
    }

    #[test]
    fn unknown_words_are_skipped() {
        let mut cpu = loaded([0xffff_ffff, 0x0000_0000, 0x2001_0001]);
        let kinds = record_kinds(&mut cpu);

        assert_eq!(cpu.run_program(), Ok(3));
        assert_eq!(cpu.gpr(1), Ok(1));
        assert_eq!(*kinds.lock().unwrap(), vec![None, None, Some(Kind::Addi)]);
        assert_eq!((cpu.pc(), cpu.npc()), (12, 16));
    }

    #[test]
    fn addi_touches_only_its_target() {
        for _ in 0..200 {
            let base: i32 = rand::random();
            let imm: i16 = rand::random();
            // addi r2, r1, imm
            let mut cpu = loaded([0x2022_0000 | u32::from(imm as u16)]);
            cpu.set_gpr(1, base).unwrap();
            let mut expected = cpu.reg().clone();

            cpu.step_program(1).unwrap();
            expected.set_gpr(2, base.wrapping_add(i32::from(imm)) as u32);
            expected.advance();
            assert_eq!(cpu.reg(), &expected);
        }
    }

    #[test]
    fn divu_and_mflo_mfhi() {
        let mut cpu = loaded([
            0x0022_001b, // divu r1, r2
            0x0000_1812, // mflo r3
            0x0000_2010, // mfhi r4
        ]);
        cpu.set_gpr(1, 12).unwrap();
        cpu.set_gpr(2, 4).unwrap();
        cpu.run_program().unwrap();
        assert_eq!((cpu.lo(), cpu.hi()), (3, 0));
        assert_eq!(gprs(&cpu, &[3, 4]), vec![3, 0]);
    }

    #[test]
    fn mult_mode_is_configurable() {
        // mult r1, r2
        let program = Program::from([0x0022_0018]);
        let run = |mult| {
            let mut cpu = Cpu::new(Config { mult, ..Config::default() });
            cpu.load_program(program.clone());
            cpu.set_gpr(1, 0x10_0000).unwrap();
            cpu.set_gpr(2, -0x10_0000).unwrap();
            cpu.run_program().unwrap();
            (cpu.hi(), cpu.lo())
        };

        assert_eq!(run(MultMode::Full), (-0x100, 0));
        assert_eq!(run(MultMode::Truncated), (0, 0));
    }

    #[test]
    fn reset_reproduces_a_fresh_run() {
        let mut fresh = loaded(FIB);
        fresh.run_program().unwrap();

        let mut cpu = loaded(FIB);
        cpu.step_program(20).unwrap();
        cpu.set_gpr(9, 99).unwrap();
        cpu.reset();
        assert_eq!(cpu.status(), Status::Loaded);
        assert_eq!(cpu.steps(), 0);
        assert_eq!(cpu.reg(), &reg::File::default());
        cpu.run_program().unwrap();
        assert_eq!(cpu.reg(), fresh.reg());

        // Again, from the halted state.
        cpu.reset();
        cpu.run_program().unwrap();
        assert_eq!(cpu.reg(), fresh.reg());
    }

    #[test]
    fn loading_after_a_halt_starts_over() {
        let mut cpu = loaded(SUM);
        cpu.run_program().unwrap();
        assert_eq!(cpu.status(), Status::Halted);

        // addi rN, r0, N for N in 1..=5
        cpu.load_program([0x2001_0001, 0x2002_0002, 0x2003_0003, 0x2004_0004, 0x2005_0005]);
        assert_eq!(cpu.status(), Status::Loaded);
        assert_eq!((cpu.pc(), cpu.npc()), (4, 4));
        assert_eq!(cpu.fetch_index(), Some(0));
        assert_eq!(cpu.steps(), 0);
        assert_eq!(gprs(&cpu, &[4, 5, 6]), vec![0, 0, 0]);

        assert_eq!(cpu.run_program(), Ok(5));
        assert_eq!(gprs(&cpu, &[1, 2, 3, 4, 5, 6]), vec![1, 2, 3, 4, 5, 0]);
        assert_eq!((cpu.pc(), cpu.npc()), (20, 24));
        assert_eq!(cpu.status(), Status::Halted);
    }

    #[test]
    fn loading_midway_discards_register_state() {
        let mut cpu = loaded(FIB);
        cpu.step_program(9).unwrap();
        assert_eq!(cpu.status(), Status::Running);

        cpu.load_program(FIB);
        assert_eq!(cpu.status(), Status::Loaded);
        assert_eq!(cpu.reg(), &reg::File::default());
        assert_eq!(cpu.run_program(), Ok(53));
        assert_eq!(gprs(&cpu, &[1, 2]), vec![55, 89]);
    }

    #[test]
    fn loading_keeps_the_r0_policy() {
        let mut cpu = Cpu::new(Config { hardwire_zero: true, ..Config::default() });
        cpu.load_program(SUM);
        assert!(cpu.reg().hardwires_zero());
        // addi r0, r0, 5
        cpu.load_program([0x2000_0005]);
        assert!(cpu.reg().hardwires_zero());
        cpu.run_program().unwrap();
        assert_eq!(cpu.gpr(0), Ok(0));
    }

    #[test]
    fn engines_sharing_a_program_agree() {
        let program = Program::from(FIB);
        let mut a = Cpu::default();
        let mut b = Cpu::default();
        a.load_program(program.clone());
        b.load_program(program.clone());

        b.step_program(7).unwrap();
        a.run_program().unwrap();
        b.run_program().unwrap();
        assert_eq!(a.reg(), b.reg());
        assert_eq!(program, Program::from(FIB));
    }

    #[test]
    fn register_indices_are_checked() {
        let mut cpu = Cpu::default();
        assert_eq!(cpu.gpr(31), Ok(0));
        assert_eq!(cpu.gpr(32), Err(Error::RegisterOutOfRange { index: 32 }));
        assert_eq!(cpu.set_gpr(usize::MAX, 1), Err(Error::RegisterOutOfRange { index: usize::MAX }));
        assert_eq!(cpu.set_gpr(31, -1), Ok(()));
        assert_eq!(cpu.gpr(31), Ok(-1));
        assert_eq!(cpu.reg().gprs()[31], u32::MAX);
    }

    #[test]
    fn r0_policy_follows_config() {
        // addi r0, r0, 5
        let program = Program::from([0x2000_0005]);

        let mut cpu = loaded(program.clone());
        cpu.run_program().unwrap();
        assert_eq!(cpu.gpr(0), Ok(5));

        let mut cpu = Cpu::new(Config { hardwire_zero: true, ..Config::default() });
        cpu.load_program(program);
        cpu.run_program().unwrap();
        assert_eq!(cpu.gpr(0), Ok(0));
    }

    #[test]
    fn lifecycle() {
        let mut cpu = Cpu::default();
        assert_eq!(cpu.status(), Status::Idle);
        assert_eq!(cpu.run_program(), Err(Error::NoProgram));
        assert_eq!(cpu.step_program(1), Err(Error::NoProgram));
        cpu.reset();
        assert_eq!(cpu.status(), Status::Idle);

        cpu.load_program(Vec::<i32>::new());
        assert_eq!(cpu.status(), Status::Halted);
        assert_eq!(cpu.run_program(), Ok(0));

        cpu.load_program(SUM);
        assert_eq!(cpu.status(), Status::Loaded);
        assert_eq!(cpu.step_program(0), Ok(0));
        assert_eq!(cpu.status(), Status::Loaded);
        cpu.step_program(1).unwrap();
        assert_eq!(cpu.status(), Status::Running);
        cpu.run_program().unwrap();
        assert_eq!(cpu.status(), Status::Halted);
        cpu.reset();
        assert_eq!(cpu.status(), Status::Loaded);
    }

    #[test]
    fn traces_render_as_assembly() {
        let trace = Trace {
            index: 2,
            word: Word::from(0x00a4_3020_u32),
            key: 0x200,
            kind: Some(Kind::Add),
            pc: 12,
            npc: 16,
        };
        assert_eq!(trace.to_string(), "0002  00a43020   add r6, r5, r4");

        let trace = Trace { kind: None, key: 0x3f, ..trace };
        assert!(trace.to_string().ends_with("(unknown key 0x3f)"));
    }
}
